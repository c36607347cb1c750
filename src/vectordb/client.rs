use qdrant_client::Qdrant;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfigKind;
use qdrant_client::qdrant::vectors_output::VectorsOptions;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance, FieldType,
    Filter, GetPointsBuilder, PointId, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use tracing::{debug, info, instrument};

use super::error::VectorDbError;
use super::model::{
    EmbeddingHit, EmbeddingRecord, FIELD_COURSE_ID, FIELD_SUBMISSION_ID, FIELD_TENANT_ID,
    SearchScope, StoredEmbedding,
};
use crate::constants::validate_embedding_dim;
use crate::hashing::submission_point_id;

/// Persistence and nearest-neighbour access for submission embeddings.
///
/// Every query carries a tenant filter; implementations must treat it as a hard constraint.
pub trait EmbeddingStore: Send + Sync {
    /// Returns `true` if the backend answers requests.
    fn is_ready(&self) -> impl std::future::Future<Output = bool> + Send;

    /// Creates the collection if missing; fails if an existing one has another dimension.
    fn ensure_collection(
        &self,
        vector_size: u64,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;

    /// Inserts or replaces the record for `record.submission_id` in one write.
    fn upsert(
        &self,
        record: EmbeddingRecord,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;

    /// Returns up to `k` records inside `scope`, most similar first.
    fn query_top_k(
        &self,
        vector: &[f32],
        scope: &SearchScope,
        k: usize,
    ) -> impl std::future::Future<Output = Result<Vec<EmbeddingHit>, VectorDbError>> + Send;

    /// Reads the stored embedding for a submission owned by `tenant_id`.
    fn get_embedding(
        &self,
        submission_id: &str,
        tenant_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<StoredEmbedding>, VectorDbError>> + Send;

    /// Ranks the tenant's other submissions against a stored embedding.
    ///
    /// Returns an empty list when the submission has no stored embedding.
    fn query_top_k_for_existing(
        &self,
        submission_id: &str,
        tenant_id: &str,
        k: usize,
    ) -> impl std::future::Future<Output = Result<Vec<EmbeddingHit>, VectorDbError>> + Send {
        async move {
            let Some(stored) = self.get_embedding(submission_id, tenant_id).await? else {
                return Ok(Vec::new());
            };
            let scope = SearchScope::tenant(tenant_id).excluding(submission_id);
            self.query_top_k(&stored.vector, &scope, k).await
        }
    }
}

#[derive(Clone)]
/// Qdrant-backed [`EmbeddingStore`].
pub struct QdrantEmbeddingStore {
    client: Qdrant,
    url: String,
    collection: String,
}

impl std::fmt::Debug for QdrantEmbeddingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantEmbeddingStore")
            .field("url", &self.url)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl QdrantEmbeddingStore {
    /// Creates a client for `url` writing to `collection`.
    pub fn new(url: &str, collection: &str) -> Result<Self, VectorDbError> {
        let client =
            Qdrant::from_url(url)
                .build()
                .map_err(|e| VectorDbError::ConnectionFailed {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

        Ok(Self {
            client,
            url: url.to_string(),
            collection: collection.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Performs a basic health check request.
    pub async fn health_check(&self) -> Result<(), VectorDbError> {
        self.client
            .health_check()
            .await
            .map_err(|e| VectorDbError::ConnectionFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn create_error(&self, e: impl ToString) -> VectorDbError {
        VectorDbError::CreateCollectionFailed {
            collection: self.collection.clone(),
            message: e.to_string(),
        }
    }

    async fn existing_vector_size(&self) -> Result<Option<u64>, VectorDbError> {
        let info = self
            .client
            .collection_info(self.collection.as_str())
            .await
            .map_err(|e| self.create_error(e))?;

        Ok(info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|kind| match kind {
                VectorsConfigKind::Params(params) => Some(params.size),
                _ => None,
            }))
    }

    async fn create_collection(&self, vector_size: u64) -> Result<(), VectorDbError> {
        let vectors_config = VectorParamsBuilder::new(vector_size, Distance::Cosine);

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(vectors_config)
                    .on_disk_payload(true),
            )
            .await
            .map_err(|e| self.create_error(e))?;

        for field in [FIELD_TENANT_ID, FIELD_COURSE_ID, FIELD_SUBMISSION_ID] {
            self.client
                .create_field_index(CreateFieldIndexCollectionBuilder::new(
                    &self.collection,
                    field,
                    FieldType::Keyword,
                ))
                .await
                .map_err(|e| self.create_error(e))?;
        }

        info!(
            collection = %self.collection,
            vector_size, "Created submission embedding collection"
        );
        Ok(())
    }
}

fn scope_filter(scope: &SearchScope) -> Filter {
    let mut must = vec![Condition::matches(FIELD_TENANT_ID, scope.tenant_id.clone())];
    if let Some(course_id) = &scope.course_id {
        must.push(Condition::matches(FIELD_COURSE_ID, course_id.clone()));
    }

    let must_not = scope
        .exclude_submission_id
        .iter()
        .map(|id| Condition::matches(FIELD_SUBMISSION_ID, id.clone()))
        .collect();

    Filter {
        must,
        must_not,
        ..Default::default()
    }
}

impl EmbeddingStore for QdrantEmbeddingStore {
    async fn is_ready(&self) -> bool {
        self.health_check().await.is_ok()
    }

    async fn ensure_collection(&self, vector_size: u64) -> Result<(), VectorDbError> {
        let exists = self
            .client
            .collection_exists(self.collection.as_str())
            .await
            .map_err(|e| self.create_error(e))?;

        if !exists {
            return self.create_collection(vector_size).await;
        }

        if let Some(actual) = self.existing_vector_size().await? {
            validate_embedding_dim(actual as usize, vector_size as usize)?;
        }
        Ok(())
    }

    async fn upsert(&self, record: EmbeddingRecord) -> Result<(), VectorDbError> {
        let point_id = submission_point_id(&record.tenant_id, &record.submission_id);
        let payload = record.payload();
        let point = PointStruct::new(point_id, record.embedding, payload);

        // wait=true: readers see the record as soon as the upsert returns.
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await
            .map_err(|e| VectorDbError::UpsertFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        debug!(point_id, "Embedding record upserted");
        Ok(())
    }

    #[instrument(skip(self, vector), fields(tenant_id = %scope.tenant_id, k))]
    async fn query_top_k(
        &self,
        vector: &[f32],
        scope: &SearchScope,
        k: usize,
    ) -> Result<Vec<EmbeddingHit>, VectorDbError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let request = SearchPointsBuilder::new(&self.collection, vector.to_vec(), k as u64)
            .filter(scope_filter(scope))
            .with_payload(true);

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(|e| VectorDbError::SearchFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| EmbeddingHit::from_payload(&point.payload, point.score))
            .collect())
    }

    async fn get_embedding(
        &self,
        submission_id: &str,
        tenant_id: &str,
    ) -> Result<Option<StoredEmbedding>, VectorDbError> {
        let point_id = PointId::from(submission_point_id(tenant_id, submission_id));
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(&self.collection, vec![point_id])
                    .with_payload(true)
                    .with_vectors(true),
            )
            .await
            .map_err(|e| VectorDbError::ReadFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        let Some(point) = response.result.into_iter().next() else {
            return Ok(None);
        };

        #[allow(deprecated)]
        let vector = point
            .vectors
            .and_then(|v| v.vectors_options)
            .and_then(|options| match options {
                VectorsOptions::Vector(v) => Some(v.data),
                _ => None,
            })
            .unwrap_or_default();

        Ok(StoredEmbedding::from_payload(&point.payload, vector)
            .filter(|s| s.tenant_id == tenant_id && s.submission_id == submission_id))
    }
}
