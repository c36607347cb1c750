use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;
use serde_json::Value;

use super::error::{SubmissionStoreError, SubmissionStoreResult};
use super::model::Submission;
use super::store::SubmissionStore;

/// In-memory [`SubmissionStore`] keyed by `(tenant_id, submission_id)`.
#[derive(Debug, Default)]
pub struct MockSubmissionStore {
    submissions: RwLock<HashMap<(String, String), Submission>>,
    settings: RwLock<HashMap<String, Value>>,
    fail_settings: AtomicBool,
    fail_flag_writes: AtomicBool,
    flag_writes: AtomicUsize,
    settings_reads: AtomicUsize,
    close_calls: AtomicUsize,
    closed: AtomicBool,
}

impl MockSubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, submission: Submission) {
        let key = (submission.tenant_id.clone(), submission.id.clone());
        self.submissions.write().insert(key, submission);
    }

    pub fn set_settings(&self, tenant_id: &str, settings: Value) {
        self.settings.write().insert(tenant_id.to_string(), settings);
    }

    pub fn submission(&self, tenant_id: &str, submission_id: &str) -> Option<Submission> {
        self.submissions
            .read()
            .get(&(tenant_id.to_string(), submission_id.to_string()))
            .cloned()
    }

    pub fn is_flagged(&self, tenant_id: &str, submission_id: &str) -> bool {
        self.submission(tenant_id, submission_id)
            .is_some_and(|s| s.is_flagged)
    }

    pub fn set_fail_settings(&self, fail: bool) {
        self.fail_settings.store(fail, Ordering::Relaxed);
    }

    pub fn set_fail_flag_writes(&self, fail: bool) {
        self.fail_flag_writes.store(fail, Ordering::Relaxed);
    }

    /// Number of successful `set_flagged` calls.
    pub fn flag_writes(&self) -> usize {
        self.flag_writes.load(Ordering::Relaxed)
    }

    pub fn settings_reads(&self) -> usize {
        self.settings_reads.load(Ordering::Relaxed)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::Relaxed)
    }

    fn ensure_open(&self) -> SubmissionStoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(SubmissionStoreError::Closed)
        } else {
            Ok(())
        }
    }
}

impl SubmissionStore for MockSubmissionStore {
    async fn get_by_id(
        &self,
        submission_id: &str,
        tenant_id: &str,
    ) -> SubmissionStoreResult<Option<Submission>> {
        self.ensure_open()?;
        Ok(self.submission(tenant_id, submission_id))
    }

    async fn set_flagged(&self, submission_id: &str, tenant_id: &str) -> SubmissionStoreResult<()> {
        self.ensure_open()?;
        if self.fail_flag_writes.load(Ordering::Relaxed) {
            return Err(SubmissionStoreError::query("set_flagged", "injected failure"));
        }

        if let Some(submission) = self
            .submissions
            .write()
            .get_mut(&(tenant_id.to_string(), submission_id.to_string()))
        {
            submission.is_flagged = true;
        }
        self.flag_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn get_tenant_settings(&self, tenant_id: &str) -> SubmissionStoreResult<Option<Value>> {
        self.ensure_open()?;
        self.settings_reads.fetch_add(1, Ordering::Relaxed);
        if self.fail_settings.load(Ordering::Relaxed) {
            return Err(SubmissionStoreError::query(
                "get_tenant_settings",
                "injected failure",
            ));
        }
        Ok(self.settings.read().get(tenant_id).cloned())
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::Relaxed);
        self.closed.store(true, Ordering::Release);
    }
}

/// Builds a submission fixture with a fixed timestamp.
pub fn fixture_submission(id: &str, tenant_id: &str, course_id: &str, text: &str) -> Submission {
    Submission {
        id: id.to_string(),
        tenant_id: tenant_id.to_string(),
        course_id: course_id.to_string(),
        user_id: format!("user-{id}"),
        text_content: text.to_string(),
        submitted_at: chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
        is_flagged: false,
    }
}
