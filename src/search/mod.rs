//! Tenant-scoped similarity search over stored submission embeddings.

mod engine;
mod error;


pub use engine::{SimilarityResult, SimilaritySearch};
pub use error::{SearchError, SearchResult};
