use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use super::error::SearchResult;
use crate::constants::{DEFAULT_TOP_K, clamp_top_k, validate_embedding_dim};
use crate::vectordb::{EmbeddingHit, EmbeddingStore, SearchScope};

/// A ranked neighbour. Derived on every query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityResult {
    pub submission_id: String,
    pub user_id: String,
    /// Cosine similarity; `1.0` is identical and negative values are kept as-is.
    pub similarity: f32,
    pub submitted_at: DateTime<Utc>,
}

impl From<EmbeddingHit> for SimilarityResult {
    fn from(hit: EmbeddingHit) -> Self {
        Self {
            submission_id: hit.submission_id,
            user_id: hit.user_id,
            similarity: hit.score,
            submitted_at: hit.submitted_at,
        }
    }
}

/// Ranks stored embeddings against a query inside a tenant scope.
pub struct SimilaritySearch<V> {
    store: Arc<V>,
    embedding_dim: usize,
}

impl<V> Clone for SimilaritySearch<V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            embedding_dim: self.embedding_dim,
        }
    }
}

impl<V: EmbeddingStore> SimilaritySearch<V> {
    pub fn new(store: Arc<V>, embedding_dim: usize) -> Self {
        Self {
            store,
            embedding_dim,
        }
    }

    pub fn store(&self) -> &Arc<V> {
        &self.store
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Top-`top_k` neighbours of `query` within `(tenant_id, course_id)`.
    ///
    /// `top_k` is capped at [`crate::constants::MAX_TOP_K`]; zero yields an empty list.
    #[instrument(skip(self, query, exclude_submission_id))]
    pub async fn search(
        &self,
        query: &[f32],
        tenant_id: &str,
        course_id: &str,
        exclude_submission_id: Option<&str>,
        top_k: usize,
    ) -> SearchResult<Vec<SimilarityResult>> {
        validate_embedding_dim(query.len(), self.embedding_dim)?;

        let k = clamp_top_k(top_k);
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scope = SearchScope::course(tenant_id, course_id);
        if let Some(id) = exclude_submission_id {
            scope = scope.excluding(id);
        }

        let hits = self.store.query_top_k(query, &scope, k).await?;
        let results = rank(hits, &scope, k);
        debug!(results = results.len(), "Similarity search complete");
        Ok(results)
    }

    /// Ranks the tenant's other submissions against the stored embedding of `submission_id`.
    ///
    /// Returns an empty list when the submission has no stored embedding.
    pub async fn find_similar_to(
        &self,
        submission_id: &str,
        tenant_id: &str,
        top_k: usize,
    ) -> SearchResult<Vec<SimilarityResult>> {
        let k = clamp_top_k(top_k);
        if k == 0 {
            return Ok(Vec::new());
        }

        let hits = self
            .store
            .query_top_k_for_existing(submission_id, tenant_id, k)
            .await?;
        let scope = SearchScope::tenant(tenant_id).excluding(submission_id);
        Ok(rank(hits, &scope, k))
    }

    /// Read API: [`Self::find_similar_to`] with `top_k` defaulting to [`DEFAULT_TOP_K`].
    pub async fn get_similar_submissions(
        &self,
        submission_id: &str,
        tenant_id: &str,
        top_k: Option<usize>,
    ) -> SearchResult<Vec<SimilarityResult>> {
        self.find_similar_to(submission_id, tenant_id, top_k.unwrap_or(DEFAULT_TOP_K))
            .await
    }
}

// Stores are trusted to filter, but the scope is re-checked before anything leaves the engine.
// Ties are ordered by submission id among the hits the store returned. When more hits tie at
// the k-th score than fit, which of them the store returned is the store's choice.
pub(super) fn rank(
    mut hits: Vec<EmbeddingHit>,
    scope: &SearchScope,
    k: usize,
) -> Vec<SimilarityResult> {
    hits.retain(|h| scope.admits(&h.tenant_id, &h.course_id, &h.submission_id));
    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.submission_id.cmp(&b.submission_id))
    });
    hits.truncate(k);
    hits.into_iter().map(SimilarityResult::from).collect()
}
