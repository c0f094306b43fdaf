//! Client error types.
//!
//! Errors are categorized by where the call went wrong:
//!
//! | Category | Variants | Recovery |
//! |----------|----------|----------|
//! | **Transport** | `Transport`, `NotFound`, `Network` | Retry transient ones, otherwise abort the step |
//! | **Payload** | `Deserialization`, `Serialization` | Fix client/server shape mismatch |
//! | **Job** | `NoJobCreated`, `Cancelled` | Resubmit or abort |
//! | **Setup** | `NotAuthenticated`, `InvalidHeader`, `Configuration`, `Io` | Fix configuration |
//!
//! A job that *ends* in Error, Stopped or Killed is not a client error; see
//! [`crate::job::JobOutcome`].

use reqwest::StatusCode;
use thiserror::Error;

use crate::job::JobHandle;

/// Errors that can occur while talking to the service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Non-success HTTP status other than 404. `body` is the server's detail.
    #[error("Request failed ({status}): {body}")]
    Transport { status: StatusCode, body: String },

    /// 404 on a call that requires a value.
    #[error("Resource not found: {url}")]
    NotFound { url: String },

    /// Connection, timeout or body-read failure below HTTP status level.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Successful response whose body does not match the expected shape.
    #[error("Unexpected response body: {source}")]
    Deserialization {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    /// Request payload could not be encoded.
    #[error("Could not encode request body: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The job-creating call returned no handle.
    #[error("No job created by {url}")]
    NoJobCreated { url: String },

    /// The wait was abandoned by the caller. `last` is the last fetched handle.
    #[error("Wait for job {} cancelled (last status: {})", .last.id, .last.status)]
    Cancelled { last: Box<JobHandle> },

    /// A call needing a token was made before authenticating.
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Returns `true` if the call may succeed when issued again.
    ///
    /// The client never retries on its own; this only informs the caller.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Transport { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            Self::Network(e) => e.status(),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
