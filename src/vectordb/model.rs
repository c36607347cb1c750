use std::collections::HashMap;

use chrono::{DateTime, Utc};
use qdrant_client::qdrant::Value;

pub(crate) const FIELD_SUBMISSION_ID: &str = "submission_id";
pub(crate) const FIELD_TENANT_ID: &str = "tenant_id";
pub(crate) const FIELD_COURSE_ID: &str = "course_id";
pub(crate) const FIELD_USER_ID: &str = "user_id";
pub(crate) const FIELD_SUBMITTED_AT: &str = "submitted_at";
pub(crate) const FIELD_HIGHEST_SIMILARITY: &str = "highest_similarity";
pub(crate) const FIELD_CHECKED_AT: &str = "checked_at";

/// One stored embedding per submission.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub submission_id: String,
    pub tenant_id: String,
    pub course_id: String,
    pub user_id: String,
    pub submitted_at: DateTime<Utc>,
    pub embedding: Vec<f32>,
    pub highest_similarity: f32,
    pub checked_at: DateTime<Utc>,
}

impl EmbeddingRecord {
    pub(crate) fn payload(&self) -> HashMap<String, Value> {
        let mut payload: HashMap<String, Value> = HashMap::new();
        payload.insert(FIELD_SUBMISSION_ID.to_string(), self.submission_id.clone().into());
        payload.insert(FIELD_TENANT_ID.to_string(), self.tenant_id.clone().into());
        payload.insert(FIELD_COURSE_ID.to_string(), self.course_id.clone().into());
        payload.insert(FIELD_USER_ID.to_string(), self.user_id.clone().into());
        payload.insert(
            FIELD_SUBMITTED_AT.to_string(),
            self.submitted_at.timestamp_millis().into(),
        );
        payload.insert(
            FIELD_HIGHEST_SIMILARITY.to_string(),
            (self.highest_similarity as f64).into(),
        );
        payload.insert(
            FIELD_CHECKED_AT.to_string(),
            self.checked_at.timestamp_millis().into(),
        );
        payload
    }
}

/// Scope applied as a hard filter to every nearest-neighbour query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchScope {
    pub tenant_id: String,
    /// `None` searches the whole tenant.
    pub course_id: Option<String>,
    pub exclude_submission_id: Option<String>,
}

impl SearchScope {
    pub fn tenant(tenant_id: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            course_id: None,
            exclude_submission_id: None,
        }
    }

    pub fn course(tenant_id: &str, course_id: &str) -> Self {
        Self {
            course_id: Some(course_id.to_string()),
            ..Self::tenant(tenant_id)
        }
    }

    pub fn excluding(mut self, submission_id: &str) -> Self {
        self.exclude_submission_id = Some(submission_id.to_string());
        self
    }

    /// Returns `true` if a record with these keys falls inside the scope.
    pub fn admits(&self, tenant_id: &str, course_id: &str, submission_id: &str) -> bool {
        tenant_id == self.tenant_id
            && self.course_id.as_deref().is_none_or(|c| c == course_id)
            && self.exclude_submission_id.as_deref() != Some(submission_id)
    }
}

/// A neighbour returned by the store, scored by cosine similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingHit {
    pub submission_id: String,
    pub tenant_id: String,
    pub course_id: String,
    pub user_id: String,
    pub submitted_at: DateTime<Utc>,
    pub score: f32,
}

impl EmbeddingHit {
    pub(crate) fn from_payload(payload: &HashMap<String, Value>, score: f32) -> Option<Self> {
        let submission_id = payload_str(payload, FIELD_SUBMISSION_ID)?;
        let tenant_id = payload_str(payload, FIELD_TENANT_ID)?;

        Some(Self {
            submission_id,
            tenant_id,
            course_id: payload_str(payload, FIELD_COURSE_ID).unwrap_or_default(),
            user_id: payload_str(payload, FIELD_USER_ID).unwrap_or_default(),
            submitted_at: payload_millis(payload, FIELD_SUBMITTED_AT),
            score,
        })
    }
}

/// A stored vector read back for the "similar to an existing submission" path.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEmbedding {
    pub submission_id: String,
    pub tenant_id: String,
    pub course_id: String,
    pub vector: Vec<f32>,
    pub highest_similarity: f32,
    pub checked_at: DateTime<Utc>,
}

impl StoredEmbedding {
    pub(crate) fn from_payload(payload: &HashMap<String, Value>, vector: Vec<f32>) -> Option<Self> {
        Some(Self {
            submission_id: payload_str(payload, FIELD_SUBMISSION_ID)?,
            tenant_id: payload_str(payload, FIELD_TENANT_ID)?,
            course_id: payload_str(payload, FIELD_COURSE_ID).unwrap_or_default(),
            vector,
            highest_similarity: payload
                .get(FIELD_HIGHEST_SIMILARITY)
                .and_then(|v| v.as_double())
                .unwrap_or(0.0) as f32,
            checked_at: payload_millis(payload, FIELD_CHECKED_AT),
        })
    }
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn payload_millis(payload: &HashMap<String, Value>, key: &str) -> DateTime<Utc> {
    payload
        .get(key)
        .and_then(|v| v.as_integer())
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or(DateTime::UNIX_EPOCH)
}
