//! Cross-cutting, shared constants.
//!
//! # Dimension Invariants
//!
//! The embedding dimension is fixed per deployment. Every stored vector must have exactly
//! that many components; a mismatch is a configuration error, not a per-message failure.
//! Pass the runtime value around as a [`DimConfig`]. The embedder output, search queries and
//! store writes are each checked with [`validate_embedding_dim`], and every error type on
//! those paths converts from [`DimMismatch`].

use thiserror::Error;

pub const DEFAULT_EMBEDDING_DIM: usize = 768;

/// Threshold used when a tenant has no usable `plagiarism_threshold` setting.
pub const DEFAULT_PLAGIARISM_THRESHOLD: f32 = 0.85;

/// Settings key read from the tenant settings blob.
pub const THRESHOLD_SETTING_KEY: &str = "plagiarism_threshold";

/// Number of neighbours returned when the caller does not ask for a specific count.
pub const DEFAULT_TOP_K: usize = 10;

/// Hard ceiling applied silently to every caller-supplied `top_k`.
pub const MAX_TOP_K: usize = 500;

/// Upper bound on the threshold cache TTL; tenant setting changes become visible within it.
pub const MAX_THRESHOLD_CACHE_TTL_SECS: u64 = 300;

pub const DEFAULT_COLLECTION_NAME: &str = "submission_embeddings";

/// Runtime dimension configuration shared by the embedder, store and search engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimConfig {
    /// The embedding vector dimension (number of floats).
    pub embedding_dim: usize,
}

impl Default for DimConfig {
    fn default() -> Self {
        Self {
            embedding_dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl DimConfig {
    pub fn new(embedding_dim: usize) -> Self {
        Self { embedding_dim }
    }

    pub fn vector_size(&self) -> u64 {
        self.embedding_dim as u64
    }
}

/// A vector whose length differs from the deployment's dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("embedding dimension mismatch: expected {expected}, got {actual}")]
pub struct DimMismatch {
    pub expected: usize,
    pub actual: usize,
}

/// Checks that a vector has the deployment's dimension.
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimMismatch> {
    if actual != expected {
        return Err(DimMismatch { expected, actual });
    }
    Ok(())
}

/// Clamps a caller-supplied neighbour count to [`MAX_TOP_K`].
pub fn clamp_top_k(top_k: usize) -> usize {
    top_k.min(MAX_TOP_K)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dim_config_default() {
        let config = DimConfig::default();
        assert_eq!(config.embedding_dim, 768);
        assert_eq!(config.vector_size(), 768);
        assert_eq!(DimConfig::new(1024).vector_size(), 1024);
    }

    #[test]
    fn test_validate_embedding_dim() {
        assert!(validate_embedding_dim(768, 768).is_ok());
        assert_eq!(
            validate_embedding_dim(384, 768),
            Err(DimMismatch {
                expected: 768,
                actual: 384
            })
        );
    }

    #[test]
    fn test_dim_mismatch_is_fatal_on_every_path() {
        let mismatch = DimMismatch {
            expected: 768,
            actual: 384,
        };

        assert!(crate::search::SearchError::from(mismatch).is_fatal());
        assert!(crate::vectordb::VectorDbError::from(mismatch).is_fatal());
        assert_eq!(
            crate::detection::DetectionError::from(mismatch),
            crate::detection::DetectionError::DimensionMismatch {
                expected: 768,
                actual: 384
            }
        );
    }

    #[test]
    fn test_clamp_top_k() {
        assert_eq!(clamp_top_k(0), 0);
        assert_eq!(clamp_top_k(10), 10);
        assert_eq!(clamp_top_k(MAX_TOP_K), MAX_TOP_K);
        assert_eq!(clamp_top_k(10_000), MAX_TOP_K);
    }
}
