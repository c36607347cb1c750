use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};

use crate::constants::validate_embedding_dim;
use crate::hashing::submission_point_id;
use crate::vectordb::{
    EmbeddingHit, EmbeddingRecord, EmbeddingStore, SearchScope, StoredEmbedding, VectorDbError,
};

const MOCK_COLLECTION: &str = "mock_submission_embeddings";

/// In-memory [`EmbeddingStore`] that ranks by brute-force cosine similarity.
#[derive(Default)]
pub struct MockEmbeddingStore {
    collection: std::sync::RwLock<Option<MockCollection>>,
    upserts: AtomicUsize,
    fail_upserts: AtomicBool,
    fail_searches: AtomicBool,
}

#[derive(Default)]
struct MockCollection {
    vector_size: u64,
    points: HashMap<u64, EmbeddingRecord>,
}

impl MockEmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose collection already exists with `vector_size` dimensions.
    pub fn with_collection(vector_size: u64) -> Self {
        let store = Self::default();
        if let Ok(mut guard) = store.collection.write() {
            *guard = Some(MockCollection {
                vector_size,
                points: HashMap::new(),
            });
        }
        store
    }

    pub fn record_count(&self) -> usize {
        self.collection
            .read()
            .ok()
            .and_then(|c| c.as_ref().map(|c| c.points.len()))
            .unwrap_or(0)
    }

    /// Number of successful upserts since creation.
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::Relaxed)
    }

    pub fn record(&self, tenant_id: &str, submission_id: &str) -> Option<EmbeddingRecord> {
        self.collection
            .read()
            .ok()?
            .as_ref()?
            .points
            .get(&submission_point_id(tenant_id, submission_id))
            .cloned()
    }

    /// Seeds a record directly, bypassing dimension checks.
    pub fn insert_raw(&self, record: EmbeddingRecord) {
        if let Ok(mut guard) = self.collection.write() {
            let coll = guard.get_or_insert_with(|| MockCollection {
                vector_size: record.embedding.len() as u64,
                points: HashMap::new(),
            });
            coll.points
                .insert(submission_point_id(&record.tenant_id, &record.submission_id), record);
        }
    }

    pub fn set_fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::Relaxed);
    }

    pub fn set_fail_searches(&self, fail: bool) {
        self.fail_searches.store(fail, Ordering::Relaxed);
    }
}

impl EmbeddingStore for MockEmbeddingStore {
    async fn is_ready(&self) -> bool {
        self.collection.read().is_ok()
    }

    async fn ensure_collection(&self, vector_size: u64) -> Result<(), VectorDbError> {
        let mut guard =
            self.collection
                .write()
                .map_err(|_| VectorDbError::CreateCollectionFailed {
                    collection: MOCK_COLLECTION.to_string(),
                    message: "lock poisoned".to_string(),
                })?;

        match guard.as_ref() {
            Some(existing) => {
                validate_embedding_dim(existing.vector_size as usize, vector_size as usize)?;
                Ok(())
            }
            None => {
                *guard = Some(MockCollection {
                    vector_size,
                    points: HashMap::new(),
                });
                Ok(())
            }
        }
    }

    async fn upsert(&self, record: EmbeddingRecord) -> Result<(), VectorDbError> {
        if self.fail_upserts.load(Ordering::Relaxed) {
            return Err(VectorDbError::UpsertFailed {
                collection: MOCK_COLLECTION.to_string(),
                message: "injected failure".to_string(),
            });
        }

        let mut guard = self
            .collection
            .write()
            .map_err(|_| VectorDbError::UpsertFailed {
                collection: MOCK_COLLECTION.to_string(),
                message: "lock poisoned".to_string(),
            })?;
        let coll = guard
            .as_mut()
            .ok_or_else(|| VectorDbError::CollectionNotFound {
                collection: MOCK_COLLECTION.to_string(),
            })?;

        validate_embedding_dim(record.embedding.len(), coll.vector_size as usize)?;

        coll.points
            .insert(submission_point_id(&record.tenant_id, &record.submission_id), record);
        self.upserts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn query_top_k(
        &self,
        vector: &[f32],
        scope: &SearchScope,
        k: usize,
    ) -> Result<Vec<EmbeddingHit>, VectorDbError> {
        if self.fail_searches.load(Ordering::Relaxed) {
            return Err(VectorDbError::SearchFailed {
                collection: MOCK_COLLECTION.to_string(),
                message: "injected failure".to_string(),
            });
        }

        let guard = self
            .collection
            .read()
            .map_err(|_| VectorDbError::SearchFailed {
                collection: MOCK_COLLECTION.to_string(),
                message: "lock poisoned".to_string(),
            })?;
        let Some(coll) = guard.as_ref() else {
            return Err(VectorDbError::CollectionNotFound {
                collection: MOCK_COLLECTION.to_string(),
            });
        };

        validate_embedding_dim(vector.len(), coll.vector_size as usize)?;

        let mut hits: Vec<EmbeddingHit> = coll
            .points
            .values()
            .filter(|r| scope.admits(&r.tenant_id, &r.course_id, &r.submission_id))
            .map(|r| EmbeddingHit {
                submission_id: r.submission_id.clone(),
                tenant_id: r.tenant_id.clone(),
                course_id: r.course_id.clone(),
                user_id: r.user_id.clone(),
                submitted_at: r.submitted_at,
                score: cosine_similarity(vector, &r.embedding),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.submission_id.cmp(&b.submission_id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn get_embedding(
        &self,
        submission_id: &str,
        tenant_id: &str,
    ) -> Result<Option<StoredEmbedding>, VectorDbError> {
        let guard = self
            .collection
            .read()
            .map_err(|_| VectorDbError::ReadFailed {
                collection: MOCK_COLLECTION.to_string(),
                message: "lock poisoned".to_string(),
            })?;

        Ok(guard
            .as_ref()
            .and_then(|c| c.points.get(&submission_point_id(tenant_id, submission_id)))
            .filter(|r| r.tenant_id == tenant_id && r.submission_id == submission_id)
            .map(|r| StoredEmbedding {
                submission_id: r.submission_id.clone(),
                tenant_id: r.tenant_id.clone(),
                course_id: r.course_id.clone(),
                vector: r.embedding.clone(),
                highest_similarity: r.highest_similarity,
                checked_at: r.checked_at,
            }))
    }
}

/// Cosine similarity in `[-1, 1]`; zero for empty, mismatched, or zero-norm inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// Builds a record with fixed timestamps, for fixtures.
pub fn fixture_record(
    submission_id: &str,
    tenant_id: &str,
    course_id: &str,
    embedding: Vec<f32>,
) -> EmbeddingRecord {
    let epoch = DateTime::<Utc>::UNIX_EPOCH;
    EmbeddingRecord {
        submission_id: submission_id.to_string(),
        tenant_id: tenant_id.to_string(),
        course_id: course_id.to_string(),
        user_id: format!("user-{submission_id}"),
        submitted_at: epoch,
        embedding,
        highest_similarity: 0.0,
        checked_at: epoch,
    }
}
