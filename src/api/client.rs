//! HTTP transport to the daemon.

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use crate::api::{ChatMessage, ChatRequest, PullRequest};
use crate::core::chat_stream::aggregate_response;
use crate::core::error::DaemonError;
use crate::core::ndjson::NdjsonDecoder;
use crate::core::progress::ProgressIndicator;
use crate::core::pull::{track_pull, PullProgressState};
use crate::utils::url::construct_api_url;

pub const DEFAULT_DAEMON_URL: &str = "http://localhost:11434";

/// Absolute ceiling for one chat or pull call, body included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10 * 60);

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct DaemonClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl DaemonClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Liveness probe: only a 200 from the daemon root counts as running.
    pub async fn is_running(&self) -> bool {
        match self
            .client
            .get(&self.base_url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status() == StatusCode::OK,
            Err(err) => {
                debug!(base_url = %self.base_url, error = %err, "Daemon probe failed");
                false
            }
        }
    }

    /// Sends the conversation and returns the cleaned, aggregated answer.
    pub async fn chat<P>(
        &self,
        model: &str,
        messages: &[ChatMessage],
        progress: &mut P,
    ) -> Result<String, DaemonError>
    where
        P: ProgressIndicator + ?Sized,
    {
        let request = ChatRequest {
            model,
            messages,
            stream: true,
        };
        debug!(model, turns = messages.len(), "Starting chat request");

        let result = self
            .bounded(async {
                let response = self.open_stream("api/chat", &request).await?;
                let decoder = NdjsonDecoder::new(Box::pin(response.bytes_stream()));
                aggregate_response(decoder, progress).await
            })
            .await;
        if matches!(result, Err(DaemonError::Timeout)) {
            progress.abandon();
        }
        result
    }

    /// Downloads `model` (canonical `name:tag`), reporting progress as it goes.
    pub async fn pull<P>(
        &self,
        model: &str,
        progress: &mut P,
    ) -> Result<PullProgressState, DaemonError>
    where
        P: ProgressIndicator + ?Sized,
    {
        let request = PullRequest { model };
        debug!(model, "Starting pull request");

        let result = self
            .bounded(async {
                let response = self.open_stream("api/pull", &request).await?;
                let decoder = NdjsonDecoder::new(Box::pin(response.bytes_stream()));
                track_pull(decoder, progress).await
            })
            .await;
        if matches!(result, Err(DaemonError::Timeout)) {
            progress.abandon();
        }
        result
    }

    async fn open_stream<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<Response, DaemonError> {
        let url = construct_api_url(&self.base_url, endpoint);
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DaemonError::RequestFailed { status, body });
        }

        Ok(response)
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, DaemonError>>,
    ) -> Result<T, DaemonError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs_f64(), "Daemon call timed out");
                Err(DaemonError::Timeout)
            }
        }
    }
}
