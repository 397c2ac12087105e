//! Error taxonomy for calls made against the daemon.

use std::error::Error as StdError;
use std::fmt;

/// Errors surfaced by a chat or pull call. None of them are retried
/// internally; retry policy belongs to whoever made the call.
#[derive(Debug)]
pub enum DaemonError {
    /// The daemon could not be reached, or the request could not be built or
    /// transported.
    Connection(String),

    /// A stream line did not parse as the expected shape.
    Protocol(String),

    /// The daemon answered with a non-2xx status.
    RequestFailed {
        /// HTTP status code returned by the daemon.
        status: u16,
        /// Response body, kept for diagnostics.
        body: String,
    },

    /// A pull stream ended without a success marker.
    IncompleteTransfer,

    /// The absolute call ceiling elapsed.
    Timeout,

    /// The daemon reported an error in-band on a streaming endpoint.
    DaemonReported(String),
}

impl DaemonError {
    pub fn protocol(message: impl Into<String>) -> Self {
        DaemonError::Protocol(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DaemonError::Timeout)
    }
}

impl fmt::Display for DaemonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonError::Connection(message) => {
                write!(f, "Could not reach the daemon: {message}")
            }
            DaemonError::Protocol(message) => write!(f, "Malformed stream from daemon: {message}"),
            DaemonError::RequestFailed { status, body } => {
                let body = body.trim();
                if body.is_empty() {
                    write!(f, "Daemon returned status {status}")
                } else {
                    write!(f, "Daemon returned status {status}: {body}")
                }
            }
            DaemonError::IncompleteTransfer => {
                write!(f, "Pull stream ended before the daemon reported success")
            }
            DaemonError::Timeout => write!(f, "Request to the daemon timed out"),
            DaemonError::DaemonReported(message) => write!(f, "Daemon reported an error: {message}"),
        }
    }
}

impl StdError for DaemonError {}

impl From<reqwest::Error> for DaemonError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DaemonError::Timeout
        } else if err.is_decode() {
            DaemonError::Protocol(err.to_string())
        } else {
            DaemonError::Connection(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_failed_includes_status_and_body() {
        let err = DaemonError::RequestFailed {
            status: 404,
            body: "model 'nope' not found\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Daemon returned status 404: model 'nope' not found"
        );
    }

    #[test]
    fn request_failed_without_body_omits_separator() {
        let err = DaemonError::RequestFailed {
            status: 500,
            body: "   ".to_string(),
        };
        assert_eq!(err.to_string(), "Daemon returned status 500");
    }

    #[test]
    fn timeout_is_distinguishable() {
        assert!(DaemonError::Timeout.is_timeout());
        assert!(!DaemonError::IncompleteTransfer.is_timeout());
    }
}
