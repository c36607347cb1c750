//! Plagwatch library crate (used by the service binary and integration tests).
//!
//! # Public API Surface
//!
//! ## Pipeline
//! - [`Detector`], [`Consumer`] - per-submission workflow and the sequential consumer loop
//! - [`SimilaritySearch`], [`SimilarityResult`] - tenant-scoped ranking and the read API
//! - [`ThresholdResolver`] - per-tenant flagging threshold
//! - [`LifecycleManager`] - consumer task ownership and ordered shutdown
//!
//! ## Boundaries
//! - [`Embedder`], [`HttpEmbedder`] - text to vector
//! - [`EmbeddingStore`], [`QdrantEmbeddingStore`] - the `submission_embeddings` collection
//! - [`SubmissionStore`], [`PgSubmissionStore`] - submissions and tenant settings
//! - [`MessageSource`], [`ChannelSource`] - the event subscription
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod constants;
pub mod detection;
pub mod embedding;
pub mod events;
pub mod gateway;
pub mod hashing;
pub mod lifecycle;
pub mod search;
pub mod submissions;
pub mod threshold;
pub mod vectordb;

pub use config::{Config, ConfigError};
pub use constants::{
    DEFAULT_EMBEDDING_DIM, DEFAULT_PLAGIARISM_THRESHOLD, DEFAULT_TOP_K, DimConfig,
    DimMismatch, MAX_TOP_K, validate_embedding_dim,
};
pub use detection::{
    Consumer, ConsumerStats, ConsumerStop, DetectionError, DetectionOutcome, DetectionStage,
    Detector, DetectorConfig,
};
#[cfg(any(test, feature = "mock"))]
pub use embedding::MockEmbedder;
pub use embedding::{Embedder, EmbeddingError, HttpEmbedder, HttpEmbedderConfig};
pub use events::{
    ChannelPublisher, ChannelSource, EventError, MessageSource, PublishError, SubmissionCreated,
    channel, decode_event,
};
pub use hashing::{hash_to_u64, submission_point_id};
pub use lifecycle::{ConsumerExit, LifecycleError, LifecycleManager, LifecycleResult};
pub use search::{SearchError, SimilarityResult, SimilaritySearch};
#[cfg(any(test, feature = "mock"))]
pub use submissions::MockSubmissionStore;
pub use submissions::{PgSubmissionStore, Submission, SubmissionStore, SubmissionStoreError};
pub use threshold::{ThresholdResolver, threshold_from_settings};
#[cfg(any(test, feature = "mock"))]
pub use vectordb::MockEmbeddingStore;
pub use vectordb::{
    EmbeddingHit, EmbeddingRecord, EmbeddingStore, QdrantEmbeddingStore, SearchScope,
    StoredEmbedding, VectorDbError,
};
