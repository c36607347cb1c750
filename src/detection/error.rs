use thiserror::Error;

use crate::constants::DimMismatch;

/// Fatal detection errors. Per-message failures are reported as outcomes instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DetectionError {
    /// The embedder or the store disagrees with the deployment's fixed dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl From<DimMismatch> for DetectionError {
    fn from(e: DimMismatch) -> Self {
        DetectionError::DimensionMismatch {
            expected: e.expected,
            actual: e.actual,
        }
    }
}
