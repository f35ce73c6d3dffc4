use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Requester Errors
    #[error("Rate limit exceeded for {key}")]
    RateLimitExceeded {
        key: String,
    },

    #[error("Attempt timed out after {0:?}")]
    AttemptTimeout(Duration),

    #[error("Retry limit exceeded after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Request canceled")]
    Canceled,

    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected HTTP status: {0}")]
    HttpStatus(u16),

    // Provider Errors
    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Response decoding failed: {0}")]
    DecodeError(String),

    // Fan-out Errors
    #[error("Batch task failed: {0}")]
    TaskFailed(String),

    // Gateway Errors
    #[error("Invalid limit value: {0}")]
    InvalidLimit(String),

    #[error("RPC call failed with status {status}: {message}")]
    RpcError {
        status: u16,
        message: String,
    },

    // System Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// True when the caller should back off rather than treat the call as broken.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Error::RateLimitExceeded { .. } => true,
            Error::RpcError { status, .. } => *status == 429,
            _ => false,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Canceled | Error::DeadlineExceeded)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Error::HttpStatus(status.as_u16()),
            None => Error::Transport(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::DecodeError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
