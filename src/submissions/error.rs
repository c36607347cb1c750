use thiserror::Error;

/// Errors returned by [`super::SubmissionStore`] implementations.
#[derive(Debug, Error)]
pub enum SubmissionStoreError {
    /// The database could not be reached.
    #[error("failed to connect to submission store: {message}")]
    Connection {
        /// Driver error message.
        message: String,
    },

    /// A query or transaction failed.
    #[error("submission store query '{operation}' failed: {message}")]
    Query {
        /// Logical operation name.
        operation: &'static str,
        /// Driver error message.
        message: String,
    },

    /// The store has been closed.
    #[error("submission store is closed")]
    Closed,
}

impl SubmissionStoreError {
    pub(crate) fn query(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Query {
            operation,
            message: err.to_string(),
        }
    }
}

pub type SubmissionStoreResult<T> = Result<T, SubmissionStoreError>;
