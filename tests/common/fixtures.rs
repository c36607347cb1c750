//! Shared fixtures: an in-memory pipeline wired the same way the binary wires the real one.

use std::sync::Arc;
use std::time::Duration;

use plagwatch::events::{ChannelPublisher, ChannelSource, channel};
use plagwatch::vectordb::fixture_record;
use plagwatch::{
    Consumer, DEFAULT_PLAGIARISM_THRESHOLD, Detector, DetectorConfig, EmbeddingStore,
    LifecycleManager, MockEmbedder, MockEmbeddingStore, MockSubmissionStore, ThresholdResolver,
};
use plagwatch::submissions::fixture_submission;

pub const DIM: usize = 2;

pub type TestDetector = Detector<MockEmbedder, MockEmbeddingStore, MockSubmissionStore>;

pub struct Pipeline {
    pub embedder: Arc<MockEmbedder>,
    pub store: Arc<MockEmbeddingStore>,
    pub submissions: Arc<MockSubmissionStore>,
    pub detector: Arc<TestDetector>,
    pub publisher: ChannelPublisher,
    pub source: Arc<ChannelSource>,
    pub lifecycle: LifecycleManager<ChannelSource, MockSubmissionStore>,
}

impl Pipeline {
    pub fn new() -> Self {
        let embedder = Arc::new(MockEmbedder::new(DIM));
        let store = Arc::new(MockEmbeddingStore::with_collection(DIM as u64));
        let submissions = Arc::new(MockSubmissionStore::new());
        let thresholds = ThresholdResolver::new(
            Arc::clone(&submissions),
            DEFAULT_PLAGIARISM_THRESHOLD,
            Duration::ZERO,
        );
        let detector = Arc::new(Detector::new(
            Arc::clone(&embedder),
            Arc::clone(&store),
            Arc::clone(&submissions),
            thresholds,
            DetectorConfig {
                embedding_dim: DIM,
                top_k: 10,
                embed_timeout: Duration::from_secs(1),
                search_timeout: Duration::from_secs(1),
            },
        ));
        let (publisher, source) = channel(32);
        let source = Arc::new(source);
        let lifecycle = LifecycleManager::new(Arc::clone(&source), Arc::clone(&submissions));

        Self {
            embedder,
            store,
            submissions,
            detector,
            publisher,
            source,
            lifecycle,
        }
    }

    pub fn start(&self) {
        self.lifecycle
            .start_consumer(Consumer::new(
                Arc::clone(&self.detector),
                Arc::clone(&self.source),
            ))
            .expect("consumer starts");
    }

    /// Stores an already-processed submission with a fixed vector.
    pub async fn seed(&self, id: &str, tenant_id: &str, course_id: &str, vector: Vec<f32>) {
        self.submissions.insert(fixture_submission(
            id,
            tenant_id,
            course_id,
            &format!("seeded {id}"),
        ));
        self.store
            .upsert(fixture_record(id, tenant_id, course_id, vector))
            .await
            .expect("seed upsert");
    }

    /// Adds a new, unprocessed submission whose text embeds to `vector`.
    pub fn submit(&self, id: &str, tenant_id: &str, course_id: &str, text: &str, vector: Vec<f32>) {
        self.embedder.set_vector(text, vector);
        self.submissions
            .insert(fixture_submission(id, tenant_id, course_id, text));
    }

    pub async fn publish_event(&self, id: &str, tenant_id: &str, course_id: &str) {
        let payload = format!(
            r#"{{"submissionId":"{id}","tenantId":"{tenant_id}","courseId":"{course_id}"}}"#
        );
        self.publisher
            .publish(payload.into_bytes())
            .await
            .expect("publish");
    }

    /// Polls until `id` has a stored embedding record.
    pub async fn wait_for_record(&self, tenant_id: &str, id: &str) {
        for _ in 0..100 {
            if self.store.record(tenant_id, id).is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no embedding record for {tenant_id}/{id}");
    }
}
