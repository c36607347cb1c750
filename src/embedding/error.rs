use thiserror::Error;

/// Errors returned by an embedding provider.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The request never produced a response (connect failure, reset, client timeout).
    #[error("embedding request failed: {reason}")]
    Request { reason: String },

    /// The provider answered with a non-success status.
    #[error("embedding provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be interpreted as an embedding.
    #[error("invalid embedding response: {reason}")]
    InvalidResponse { reason: String },

    /// The call exceeded the caller's deadline.
    #[error("embedding call timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// The client could not be constructed.
    #[error("invalid embedding client configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            EmbeddingError::InvalidResponse {
                reason: err.to_string(),
            }
        } else {
            EmbeddingError::Request {
                reason: err.to_string(),
            }
        }
    }
}
