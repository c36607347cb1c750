use thiserror::Error;

use crate::constants::DimMismatch;

#[derive(Debug, Error)]
/// Errors returned by similarity store operations.
pub enum VectorDbError {
    /// Could not connect to the Qdrant endpoint.
    #[error("failed to connect to Qdrant at '{url}': {message}")]
    ConnectionFailed {
        /// Endpoint URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// Collection creation or inspection failed.
    #[error("failed to create collection '{collection}': {message}")]
    CreateCollectionFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// Collection does not exist.
    #[error("collection not found: {collection}")]
    CollectionNotFound {
        /// Collection name.
        collection: String,
    },

    /// Upsert failed.
    #[error("failed to upsert points to '{collection}': {message}")]
    UpsertFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// Search failed.
    #[error("failed to search in '{collection}': {message}")]
    SearchFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// Point lookup failed.
    #[error("failed to read points from '{collection}': {message}")]
    ReadFailed {
        /// Collection name.
        collection: String,
        /// Error message.
        message: String,
    },

    /// Vector dimension mismatch.
    #[error("invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },
}

impl From<DimMismatch> for VectorDbError {
    fn from(e: DimMismatch) -> Self {
        VectorDbError::InvalidDimension {
            expected: e.expected,
            actual: e.actual,
        }
    }
}

impl VectorDbError {
    /// Returns `true` for errors that indicate a deployment misconfiguration.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VectorDbError::InvalidDimension { .. })
    }
}
