//! Drives a model download from the `/api/pull` stream.

use futures_util::Stream;
use tracing::{debug, warn};

use crate::api::PullChunk;
use crate::core::error::DaemonError;
use crate::core::ndjson::NdjsonDecoder;
use crate::core::progress::ProgressIndicator;

/// The daemon opens every pull with a preliminary status line; the line after
/// it is the one that carries the download size.
const TOTAL_CHUNK_INDEX: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullProgressState {
    /// `None` while the display is indeterminate.
    pub total: Option<u64>,
    pub completed: u64,
    pub last_status: String,
}

impl PullProgressState {
    fn observe<P>(&mut self, index: usize, chunk: &PullChunk, progress: &mut P)
    where
        P: ProgressIndicator + ?Sized,
    {
        if self.total.is_none() && chunk.total > 0 {
            if index > TOTAL_CHUNK_INDEX {
                debug!(total = chunk.total, index, "Pull size arrived late");
            }
            self.total = Some(chunk.total);
            progress.set_total(chunk.total);
        } else if index == TOTAL_CHUNK_INDEX && self.total.is_none() {
            warn!(status = %chunk.status, "Pull stream carried no total; progress is indeterminate");
        }

        if chunk.completed > self.completed {
            self.completed = chunk.completed;
            progress.set_completed(self.completed);
        } else if self.total.is_none() {
            progress.tick();
        }

        if chunk.status != self.last_status {
            debug!(status = %chunk.status, "Pull status changed");
            self.last_status.clone_from(&chunk.status);
        }
    }
}

/// Consumes a pull stream until the daemon reports success.
///
/// The first line is discarded. Every later line updates the indicator on
/// the decode loop itself, so the display is always current. A stream that
/// closes before the success marker fails with
/// [`DaemonError::IncompleteTransfer`].
pub async fn track_pull<S, B, E, P>(
    mut decoder: NdjsonDecoder<S, PullChunk>,
    progress: &mut P,
) -> Result<PullProgressState, DaemonError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    DaemonError: From<E>,
    P: ProgressIndicator + ?Sized,
{
    let mut state = PullProgressState::default();
    let mut index = 0usize;

    while let Some(chunk) = decoder.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                progress.abandon();
                return Err(err);
            }
        };
        index += 1;

        if let Some(message) = &chunk.error {
            progress.abandon();
            return Err(DaemonError::DaemonReported(message.clone()));
        }

        if index == 1 {
            debug!(status = %chunk.status, "Discarding preliminary pull status");
            continue;
        }

        state.observe(index, &chunk, progress);

        if chunk.is_success() {
            progress.finish();
            return Ok(state);
        }
    }

    progress.abandon();
    Err(DaemonError::IncompleteTransfer)
}
