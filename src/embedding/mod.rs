//! Embedding client.
//!
//! - [`Embedder`] is the single capability the detection pipeline needs.
//! - [`HttpEmbedder`] talks to an OpenAI-compatible `/v1/embeddings` endpoint.

pub mod client;
mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;


pub use client::{Embedder, HttpEmbedder, HttpEmbedderConfig};
pub use error::EmbeddingError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockEmbedder;
