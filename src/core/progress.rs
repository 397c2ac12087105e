//! Progress reporting for streaming calls.
//!
//! The aggregator and pull tracker only talk to [`ProgressIndicator`]; the
//! terminal implementation is an `indicatif` bar, and tests swap in a
//! recorder.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const SPINNER_INTERVAL: Duration = Duration::from_millis(100);

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg}";
const SPINNER_TICKS: &str = "|/-\\ ";
const BYTES_TEMPLATE: &str =
    "{msg} [{bar:40.yellow/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

pub trait ProgressIndicator {
    /// Total size became known; switch to a determinate display.
    fn set_total(&mut self, total: u64);
    fn set_completed(&mut self, completed: u64);
    /// Advance an indeterminate display by one step.
    fn tick(&mut self);
    fn finish(&mut self);
    fn abandon(&mut self);
}

impl ProgressIndicator for ProgressBar {
    fn set_total(&mut self, total: u64) {
        self.set_style(
            ProgressStyle::with_template(BYTES_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        self.set_length(total);
    }

    fn set_completed(&mut self, completed: u64) {
        self.set_position(completed);
    }

    fn tick(&mut self) {
        self.inc(1);
    }

    fn finish(&mut self) {
        self.finish_using_style();
    }

    fn abandon(&mut self) {
        ProgressBar::abandon(self);
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_TICKS)
}

/// Indeterminate indicator advanced once per received chunk. Clears itself
/// when finished so the answer prints on a clean line.
pub fn response_indicator() -> ProgressBar {
    ProgressBar::new_spinner()
        .with_style(spinner_style())
        .with_message("Waiting for response")
        .with_finish(ProgressFinish::AndClear)
}

/// Download bar for a pull. Starts indeterminate until a total is known.
pub fn pull_indicator(model: &str) -> ProgressBar {
    ProgressBar::new_spinner()
        .with_style(spinner_style())
        .with_message(format!("Pulling {model}"))
        .with_finish(ProgressFinish::AndLeave)
}

/// A cosmetic spinner redrawn from a background task until stopped.
pub struct Spinner {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Spinner {
    pub fn start(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner()
            .with_style(spinner_style())
            .with_message(message.into())
            .with_finish(ProgressFinish::AndClear);
        Self::start_with(bar, SPINNER_INTERVAL)
    }

    pub fn start_with<P>(mut indicator: P, interval: Duration) -> Self
    where
        P: ProgressIndicator + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => indicator.tick(),
                }
            }
            indicator.finish();
        });

        Self { cancel, handle }
    }

    /// Cancels the redraw task and waits for it, so nothing is drawn after
    /// this returns.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::ProgressIndicator;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum ProgressEvent {
        Total(u64),
        Completed(u64),
        Tick,
        Finish,
        Abandon,
    }

    #[derive(Clone, Default)]
    pub(crate) struct RecordingProgress {
        events: Arc<Mutex<Vec<ProgressEvent>>>,
    }

    impl RecordingProgress {
        pub(crate) fn events(&self) -> Vec<ProgressEvent> {
            self.events.lock().expect("recorder lock").clone()
        }

        pub(crate) fn ticks(&self) -> usize {
            self.events()
                .iter()
                .filter(|event| **event == ProgressEvent::Tick)
                .count()
        }

        fn push(&self, event: ProgressEvent) {
            self.events.lock().expect("recorder lock").push(event);
        }
    }

    impl ProgressIndicator for RecordingProgress {
        fn set_total(&mut self, total: u64) {
            self.push(ProgressEvent::Total(total));
        }

        fn set_completed(&mut self, completed: u64) {
            self.push(ProgressEvent::Completed(completed));
        }

        fn tick(&mut self) {
            self.push(ProgressEvent::Tick);
        }

        fn finish(&mut self) {
            self.push(ProgressEvent::Finish);
        }

        fn abandon(&mut self) {
            self.push(ProgressEvent::Abandon);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{ProgressEvent, RecordingProgress};
    use super::*;

    #[tokio::test]
    async fn spinner_ticks_until_stopped_then_finishes() {
        let recorder = RecordingProgress::default();
        let spinner = Spinner::start_with(recorder.clone(), Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(60)).await;
        spinner.stop().await;

        let events = recorder.events();
        assert!(recorder.ticks() >= 1, "expected ticks, got {events:?}");
        assert_eq!(events.last(), Some(&ProgressEvent::Finish));

        let count = events.len();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(recorder.events().len(), count, "spinner drew after stop");
    }

    #[test]
    fn progress_bar_switches_to_determinate_length() {
        let mut bar = ProgressBar::hidden();
        ProgressIndicator::set_total(&mut bar, 1000);
        ProgressIndicator::set_completed(&mut bar, 250);
        assert_eq!(bar.length(), Some(1000));
        assert_eq!(bar.position(), 250);
    }
}
