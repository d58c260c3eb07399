//! Client error taxonomy

use thiserror::Error;

/// Errors surfaced by the backend adapter (and, rarely, the mock store).
///
/// Not-found is never an error: read-by-id returns `Ok(None)` and
/// delete returns `Ok(false)` instead.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Connection-level failure (refused, DNS, reset). Retryable.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The client-side request timeout elapsed. Retryable.
    #[error("Request timed out")]
    Timeout,

    /// Non-success HTTP status. 5xx is retryable, 4xx is not.
    #[error("HTTP {code}: {message}")]
    Status {
        /// HTTP status code
        code: u16,
        /// Response body or status text, for user-facing presentation
        message: String,
    },

    /// Response body could not be decoded into the expected shape
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// Request could not be built (bad base URL or path)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Whether the retry policy applies to this error.
    ///
    /// Transport and timeout errors and 5xx statuses are retryable;
    /// 4xx statuses and decode failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) | ApiError::Timeout => true,
            ApiError::Status { code, .. } => *code >= 500,
            ApiError::Decode(_) | ApiError::InvalidRequest(_) => false,
        }
    }

    /// HTTP status code, when this is a status error
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}
