use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use super::error::DetectionError;
use super::outcome::{DetectionOutcome, DetectionStage};
use crate::config::Config;
use crate::constants::validate_embedding_dim;
use crate::embedding::Embedder;
use crate::search::{SearchError, SimilaritySearch};
use crate::submissions::{Submission, SubmissionStore};
use crate::threshold::ThresholdResolver;
use crate::vectordb::{EmbeddingRecord, EmbeddingStore, VectorDbError};

/// Knobs for [`Detector`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    pub embedding_dim: usize,
    pub top_k: usize,
    pub embed_timeout: Duration,
    pub search_timeout: Duration,
}

impl From<&Config> for DetectorConfig {
    fn from(config: &Config) -> Self {
        Self {
            embedding_dim: config.embedding_dim,
            top_k: config.top_k,
            embed_timeout: config.embed_timeout,
            search_timeout: config.search_timeout,
        }
    }
}

type StepResult<T> = Result<T, Step>;

enum Step {
    Stop(DetectionOutcome),
    Fatal(DetectionError),
}

fn dropped(stage: DetectionStage, reason: impl ToString) -> Step {
    Step::Stop(DetectionOutcome::Dropped {
        stage,
        reason: reason.to_string(),
    })
}

fn fatal(expected: usize, actual: usize) -> Step {
    Step::Fatal(DetectionError::DimensionMismatch { expected, actual })
}

/// Scores one submission against its course and persists the result.
pub struct Detector<E, V, S> {
    embedder: Arc<E>,
    search: SimilaritySearch<V>,
    submissions: Arc<S>,
    thresholds: ThresholdResolver<S>,
    config: DetectorConfig,
}

impl<E, V, S> Detector<E, V, S>
where
    E: Embedder,
    V: EmbeddingStore,
    S: SubmissionStore,
{
    pub fn new(
        embedder: Arc<E>,
        store: Arc<V>,
        submissions: Arc<S>,
        thresholds: ThresholdResolver<S>,
        config: DetectorConfig,
    ) -> Self {
        Self {
            embedder,
            search: SimilaritySearch::new(store, config.embedding_dim),
            submissions,
            thresholds,
            config,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// The search engine shared with the read path.
    pub fn search(&self) -> &SimilaritySearch<V> {
        &self.search
    }

    /// Runs the full check for one submission. Safe to repeat for the same submission.
    ///
    /// Only a dimension mismatch is returned as `Err`; every other failure ends this
    /// submission and is reported in the returned outcome.
    #[instrument(skip(self))]
    pub async fn process_submission(
        &self,
        submission_id: &str,
        tenant_id: &str,
        course_id: &str,
    ) -> Result<DetectionOutcome, DetectionError> {
        let outcome = match self.run(submission_id, tenant_id, course_id).await {
            Ok(outcome) | Err(Step::Stop(outcome)) => outcome,
            Err(Step::Fatal(e)) => {
                error!(submission_id, fatal = true, error = %e, "fatal: {e}");
                log_summary(submission_id, None);
                return Err(e);
            }
        };

        log_summary(submission_id, Some(&outcome));
        Ok(outcome)
    }

    async fn run(
        &self,
        submission_id: &str,
        tenant_id: &str,
        course_id: &str,
    ) -> StepResult<DetectionOutcome> {
        let submission = self.load(submission_id, tenant_id).await?;
        let embedding = self.embed(&submission).await?;

        let neighbours = match tokio::time::timeout(
            self.config.search_timeout,
            self.search.search(
                &embedding,
                tenant_id,
                course_id,
                Some(submission_id),
                self.config.top_k,
            ),
        )
        .await
        {
            Err(_) => {
                error!(
                    submission_id,
                    timeout = ?self.config.search_timeout,
                    "Similarity search timed out"
                );
                return Err(dropped(
                    DetectionStage::Search,
                    "similarity search timed out",
                ));
            }
            Ok(Err(SearchError::DimensionMismatch { expected, actual }))
            | Ok(Err(SearchError::Store(VectorDbError::InvalidDimension { expected, actual }))) => {
                return Err(fatal(expected, actual));
            }
            Ok(Err(e)) => {
                error!(submission_id, error = %e, "Similarity search failed");
                return Err(dropped(DetectionStage::Search, e));
            }
            Ok(Ok(results)) => results,
        };

        let threshold = self.thresholds.resolve_threshold(tenant_id).await;
        let highest_similarity = neighbours
            .iter()
            .map(|r| r.similarity)
            .reduce(f32::max)
            .unwrap_or(0.0);
        let is_flagged = highest_similarity >= threshold;

        let record = EmbeddingRecord {
            submission_id: submission.id.clone(),
            tenant_id: tenant_id.to_string(),
            course_id: course_id.to_string(),
            user_id: submission.user_id.clone(),
            submitted_at: submission.submitted_at,
            embedding,
            highest_similarity,
            checked_at: Utc::now(),
        };

        match self.search.store().upsert(record).await {
            Ok(()) => {}
            Err(VectorDbError::InvalidDimension { expected, actual }) => {
                return Err(fatal(expected, actual));
            }
            Err(e) => {
                error!(submission_id, error = %e, "Failed to persist embedding record");
                return Err(dropped(DetectionStage::Persist, e));
            }
        }

        let mut flag_persisted = true;
        if is_flagged
            && !submission.is_flagged
            && let Err(e) = self.submissions.set_flagged(submission_id, tenant_id).await
        {
            // The record is already stored; redelivery rewrites it and retries the flag.
            error!(submission_id, error = %e, "Failed to flag submission");
            flag_persisted = false;
        }

        Ok(DetectionOutcome::Scored {
            highest_similarity,
            threshold,
            is_flagged,
            flag_persisted,
        })
    }

    async fn load(&self, submission_id: &str, tenant_id: &str) -> StepResult<Submission> {
        match self.submissions.get_by_id(submission_id, tenant_id).await {
            Ok(Some(submission)) => Ok(submission),
            Ok(None) => {
                warn!(submission_id, tenant_id, "Submission not found");
                Err(Step::Stop(DetectionOutcome::NotFound))
            }
            Err(e) => {
                error!(submission_id, error = %e, "Failed to load submission");
                Err(dropped(DetectionStage::Load, e))
            }
        }
    }

    async fn embed(&self, submission: &Submission) -> StepResult<Vec<f32>> {
        let embedding = match tokio::time::timeout(
            self.config.embed_timeout,
            self.embedder.embed(&submission.text_content),
        )
        .await
        {
            Ok(Ok(embedding)) => embedding,
            Ok(Err(e)) => {
                error!(submission_id = %submission.id, error = %e, "Embedding failed");
                return Err(dropped(DetectionStage::Embed, e));
            }
            Err(_) => {
                error!(
                    submission_id = %submission.id,
                    timeout = ?self.config.embed_timeout,
                    "Embedding timed out"
                );
                return Err(dropped(DetectionStage::Embed, "embedding timed out"));
            }
        };

        validate_embedding_dim(embedding.len(), self.config.embedding_dim)
            .map_err(|e| Step::Fatal(e.into()))?;
        Ok(embedding)
    }
}

/// One line per submission, whatever happened to it. Missing values are logged empty.
fn log_summary(submission_id: &str, outcome: Option<&DetectionOutcome>) {
    let highest = outcome
        .and_then(DetectionOutcome::highest_similarity)
        .map(|h| format!("{h:.4}"))
        .unwrap_or_default();
    let is_flagged = match outcome {
        Some(DetectionOutcome::Scored { is_flagged, .. }) => is_flagged.to_string(),
        _ => String::new(),
    };

    info!(
        submission_id,
        highest_similarity = %highest,
        is_flagged = %is_flagged,
        outcome = outcome.map_or("fatal", DetectionOutcome::label),
        "Plagiarism check finished"
    );
}
