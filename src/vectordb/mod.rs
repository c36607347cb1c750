//! Qdrant-backed similarity store for submission embeddings.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;


pub use client::{EmbeddingStore, QdrantEmbeddingStore};
pub use error::VectorDbError;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockEmbeddingStore, cosine_similarity, fixture_record};
pub use model::{EmbeddingHit, EmbeddingRecord, SearchScope, StoredEmbedding};

pub use crate::constants::DEFAULT_COLLECTION_NAME;
