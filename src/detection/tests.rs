use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::*;
use crate::constants::DEFAULT_PLAGIARISM_THRESHOLD;
use crate::embedding::{Embedder, EmbeddingError, MockEmbedder};
use crate::events::channel;
use crate::submissions::{MockSubmissionStore, fixture_submission};
use crate::threshold::ThresholdResolver;
use crate::vectordb::{EmbeddingStore, MockEmbeddingStore, fixture_record};

const DIM: usize = 2;

fn test_config() -> DetectorConfig {
    DetectorConfig {
        embedding_dim: DIM,
        top_k: 10,
        embed_timeout: Duration::from_secs(1),
        search_timeout: Duration::from_secs(1),
    }
}

struct Harness<E> {
    embedder: Arc<E>,
    store: Arc<MockEmbeddingStore>,
    submissions: Arc<MockSubmissionStore>,
    detector: Arc<Detector<E, MockEmbeddingStore, MockSubmissionStore>>,
}

fn harness_with<E: Embedder>(embedder: E, config: DetectorConfig) -> Harness<E> {
    let embedder = Arc::new(embedder);
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
        config,
    ));

    Harness {
        embedder,
        store,
        submissions,
        detector,
    }
}

fn harness() -> Harness<MockEmbedder> {
    harness_with(MockEmbedder::new(DIM), test_config())
}

/// Tenant `t1`, course `c1`, with `A=[1,0]` and `B=[0.99,0.01]` already stored.
async fn seeded_course() -> Harness<MockEmbedder> {
    let h = harness();
    h.embedder.set_vector("essay about rivers", vec![1.0, 0.0]);
    for (id, vector) in [("A", vec![1.0, 0.0]), ("B", vec![0.99, 0.01])] {
        h.submissions
            .insert(fixture_submission(id, "t1", "c1", &format!("text {id}")));
        h.store
            .upsert(fixture_record(id, "t1", "c1", vector))
            .await
            .unwrap();
    }
    h.submissions
        .insert(fixture_submission("C", "t1", "c1", "essay about rivers"));
    h
}

#[tokio::test]
async fn test_missing_submission_is_not_found() {
    let h = harness();

    let outcome = h
        .detector
        .process_submission("ghost", "t1", "c1")
        .await
        .unwrap();

    assert_eq!(outcome, DetectionOutcome::NotFound);
    assert_eq!(h.store.upsert_count(), 0);
    assert_eq!(h.embedder.call_count(), 0);
}

#[tokio::test]
async fn test_submission_of_other_tenant_is_not_found() {
    let h = harness();
    h.submissions
        .insert(fixture_submission("s1", "t2", "c1", "text"));

    let outcome = h.detector.process_submission("s1", "t1", "c1").await.unwrap();

    assert_eq!(outcome, DetectionOutcome::NotFound);
}

#[tokio::test]
async fn test_end_to_end_flags_copy_and_ranks_neighbours() {
    let h = seeded_course().await;

    let outcome = h.detector.process_submission("C", "t1", "c1").await.unwrap();

    let highest = outcome.highest_similarity().expect("scored");
    assert!((highest - 1.0).abs() < 1e-5);
    assert!(outcome.is_flagged());
    assert!(h.submissions.is_flagged("t1", "C"));

    let record = h.store.record("t1", "C").expect("record stored");
    assert!((record.highest_similarity - 1.0).abs() < 1e-5);
    assert_eq!(record.user_id, "user-C");

    let similar = h
        .detector
        .search()
        .get_similar_submissions("C", "t1", Some(5))
        .await
        .unwrap();
    let ids: Vec<_> = similar.iter().map(|r| r.submission_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
}

#[tokio::test]
async fn test_processing_twice_is_idempotent() {
    let h = seeded_course().await;

    let first = h.detector.process_submission("C", "t1", "c1").await.unwrap();
    let second = h.detector.process_submission("C", "t1", "c1").await.unwrap();

    assert_eq!(h.store.record_count(), 3);
    assert_eq!(first.is_flagged(), second.is_flagged());
    assert_eq!(first.highest_similarity(), second.highest_similarity());
    // Already flagged after the first run.
    assert_eq!(h.submissions.flag_writes(), 1);
}

#[tokio::test]
async fn test_lone_submission_scores_zero_without_matching_itself() {
    let h = harness();
    h.submissions
        .insert(fixture_submission("solo", "t1", "c1", "only one"));

    for _ in 0..2 {
        let outcome = h
            .detector
            .process_submission("solo", "t1", "c1")
            .await
            .unwrap();
        assert_eq!(outcome.highest_similarity(), Some(0.0));
        assert!(!outcome.is_flagged());
    }
    assert_eq!(h.store.record_count(), 1);
}

#[tokio::test]
async fn test_other_tenant_with_same_course_is_ignored() {
    let h = harness();
    h.embedder.set_vector("copied", vec![1.0, 0.0]);
    h.store
        .upsert(fixture_record("foreign", "t2", "c1", vec![1.0, 0.0]))
        .await
        .unwrap();
    h.submissions
        .insert(fixture_submission("mine", "t1", "c1", "copied"));

    let outcome = h
        .detector
        .process_submission("mine", "t1", "c1")
        .await
        .unwrap();

    assert_eq!(outcome.highest_similarity(), Some(0.0));
    assert!(!h.submissions.is_flagged("t1", "mine"));
}

#[tokio::test]
async fn test_threshold_boundary_is_inclusive() {
    let h = seeded_course().await;
    h.submissions
        .set_settings("t1", json!({"plagiarism_threshold": 1.0}));

    let outcome = h.detector.process_submission("C", "t1", "c1").await.unwrap();

    match outcome {
        DetectionOutcome::Scored {
            highest_similarity,
            threshold,
            is_flagged,
            ..
        } => {
            assert_eq!(highest_similarity, threshold);
            assert!(is_flagged);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_out_of_range_threshold_uses_default() {
    let h = seeded_course().await;
    h.submissions
        .set_settings("t1", json!({"plagiarism_threshold": 1.1}));

    let outcome = h.detector.process_submission("C", "t1", "c1").await.unwrap();

    match outcome {
        DetectionOutcome::Scored {
            threshold,
            is_flagged,
            ..
        } => {
            assert_eq!(threshold, DEFAULT_PLAGIARISM_THRESHOLD);
            assert!(is_flagged);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_dissimilar_submission_is_not_flagged() {
    let h = seeded_course().await;
    h.embedder.set_vector("unrelated", vec![0.0, 1.0]);
    h.submissions
        .insert(fixture_submission("D", "t1", "c1", "unrelated"));

    let outcome = h.detector.process_submission("D", "t1", "c1").await.unwrap();

    assert!(!outcome.is_flagged());
    assert!(h.store.record("t1", "D").is_some());
    assert_eq!(h.submissions.flag_writes(), 0);
}

#[tokio::test]
async fn test_embedding_failure_drops_without_persisting() {
    let h = harness();
    h.embedder.fail_on("broken text");
    h.submissions
        .insert(fixture_submission("s1", "t1", "c1", "broken text"));

    let outcome = h.detector.process_submission("s1", "t1", "c1").await.unwrap();

    assert!(matches!(
        outcome,
        DetectionOutcome::Dropped {
            stage: DetectionStage::Embed,
            ..
        }
    ));
    assert_eq!(h.store.upsert_count(), 0);
}

struct SlowEmbedder(Duration);

impl Embedder for SlowEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        tokio::time::sleep(self.0).await;
        Ok(vec![1.0, 0.0])
    }
}

#[tokio::test]
async fn test_embedding_timeout_drops() {
    let config = DetectorConfig {
        embed_timeout: Duration::from_millis(20),
        ..test_config()
    };
    let h = harness_with(SlowEmbedder(Duration::from_millis(500)), config);
    h.submissions
        .insert(fixture_submission("s1", "t1", "c1", "text"));

    let outcome = h.detector.process_submission("s1", "t1", "c1").await.unwrap();

    assert!(matches!(
        outcome,
        DetectionOutcome::Dropped {
            stage: DetectionStage::Embed,
            ..
        }
    ));
    assert_eq!(h.store.upsert_count(), 0);
}

#[tokio::test]
async fn test_search_failure_drops_without_persisting() {
    let h = seeded_course().await;
    h.store.set_fail_searches(true);
    let before = h.store.upsert_count();

    let outcome = h.detector.process_submission("C", "t1", "c1").await.unwrap();

    assert!(matches!(
        outcome,
        DetectionOutcome::Dropped {
            stage: DetectionStage::Search,
            ..
        }
    ));
    assert_eq!(h.store.upsert_count(), before);
    assert!(!h.submissions.is_flagged("t1", "C"));
}

#[tokio::test]
async fn test_upsert_failure_skips_flagging() {
    let h = seeded_course().await;
    h.store.set_fail_upserts(true);

    let outcome = h.detector.process_submission("C", "t1", "c1").await.unwrap();

    assert!(matches!(
        outcome,
        DetectionOutcome::Dropped {
            stage: DetectionStage::Persist,
            ..
        }
    ));
    assert!(!h.submissions.is_flagged("t1", "C"));
}

#[tokio::test]
async fn test_flag_write_failure_keeps_record() {
    let h = seeded_course().await;
    h.submissions.set_fail_flag_writes(true);

    let outcome = h.detector.process_submission("C", "t1", "c1").await.unwrap();

    assert!(matches!(
        outcome,
        DetectionOutcome::Scored {
            is_flagged: true,
            flag_persisted: false,
            ..
        }
    ));
    assert!(h.store.record("t1", "C").is_some());
}

#[tokio::test]
async fn test_wrong_embedding_dimension_is_fatal() {
    let h = harness();
    h.embedder.set_vector("three dims", vec![1.0, 0.0, 0.0]);
    h.submissions
        .insert(fixture_submission("s1", "t1", "c1", "three dims"));

    let err = h
        .detector
        .process_submission("s1", "t1", "c1")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DetectionError::DimensionMismatch {
            expected: 2,
            actual: 3
        }
    );
    assert_eq!(h.store.upsert_count(), 0);
}

#[tokio::test]
async fn test_consumer_skips_malformed_messages() {
    let h = seeded_course().await;
    let (publisher, source) = channel(16);
    let consumer = Consumer::new(Arc::clone(&h.detector), Arc::new(source));
    let upserts_before = h.store.upsert_count();

    for payload in [
        b"not json".to_vec(),
        Vec::new(),
        br#"{"submissionId":"C","courseId":"c1"}"#.to_vec(),
        br#"{"submissionId":"C","tenantId":"t1","courseId":"c1"}"#.to_vec(),
    ] {
        publisher.publish(payload).await.unwrap();
    }
    drop(publisher);

    let stats = consumer.run().await.unwrap();

    assert_eq!(stats.received, 4);
    assert_eq!(stats.malformed, 3);
    assert_eq!(stats.scored, 1);
    assert_eq!(stats.flagged, 1);
    assert_eq!(h.store.upsert_count(), upserts_before + 1);
}

#[tokio::test]
async fn test_consumer_continues_after_dropped_submission() {
    let h = seeded_course().await;
    h.embedder.fail_on("text A");
    let (publisher, source) = channel(16);
    let consumer = Consumer::new(Arc::clone(&h.detector), Arc::new(source));

    for id in ["A", "missing", "C"] {
        let payload = format!(r#"{{"submissionId":"{id}","tenantId":"t1","courseId":"c1"}}"#);
        publisher.publish(payload.into_bytes()).await.unwrap();
    }
    drop(publisher);

    let stats = consumer.run().await.unwrap();

    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.not_found, 1);
    assert_eq!(stats.scored, 1);
}

#[tokio::test]
async fn test_consumer_stops_on_dimension_mismatch() {
    let h = harness();
    h.embedder.set_vector("bad", vec![1.0]);
    h.submissions.insert(fixture_submission("s1", "t1", "c1", "bad"));
    h.submissions
        .insert(fixture_submission("s2", "t1", "c1", "fine"));
    let (publisher, source) = channel(16);
    let consumer = Consumer::new(Arc::clone(&h.detector), Arc::new(source));

    for id in ["s1", "s2"] {
        let payload = format!(r#"{{"submissionId":"{id}","tenantId":"t1","courseId":"c1"}}"#);
        publisher.publish(payload.into_bytes()).await.unwrap();
    }

    let result = consumer.run().await;

    assert!(matches!(
        result,
        Err(DetectionError::DimensionMismatch { .. })
    ));
    assert!(h.store.record("t1", "s2").is_none());
}

#[tokio::test]
async fn test_consumer_stop_interrupts_idle_wait() {
    let h = harness();
    let (_publisher, source) = channel(16);
    let consumer = Arc::new(Consumer::new(Arc::clone(&h.detector), Arc::new(source)));
    let stop = consumer.stop_handle();

    let task = {
        let consumer = Arc::clone(&consumer);
        tokio::spawn(async move { consumer.run().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    stop.stop();

    let stats = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("consumer stopped")
        .unwrap()
        .unwrap();
    assert_eq!(stats, ConsumerStats::default());
    assert!(stop.is_stopped());
}
