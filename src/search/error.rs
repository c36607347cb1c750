use thiserror::Error;

use crate::constants::DimMismatch;
use crate::vectordb::VectorDbError;

/// Errors returned by [`super::SimilaritySearch`].
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query vector does not have the deployment's dimension.
    #[error("query vector has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The similarity store failed.
    #[error(transparent)]
    Store(#[from] VectorDbError),
}

impl From<DimMismatch> for SearchError {
    fn from(e: DimMismatch) -> Self {
        SearchError::DimensionMismatch {
            expected: e.expected,
            actual: e.actual,
        }
    }
}

impl SearchError {
    /// Returns `true` when the error reflects a deployment misconfiguration.
    pub fn is_fatal(&self) -> bool {
        match self {
            SearchError::DimensionMismatch { .. } => true,
            SearchError::Store(e) => e.is_fatal(),
        }
    }
}

pub type SearchResult<T> = Result<T, SearchError>;
