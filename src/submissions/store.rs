use std::time::Duration;

use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use tracing::{debug, info, instrument};

use super::error::{SubmissionStoreError, SubmissionStoreResult};
use super::model::Submission;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Tenant-scoped access to submissions and tenant settings.
pub trait SubmissionStore: Send + Sync {
    /// Loads a submission owned by `tenant_id`.
    fn get_by_id(
        &self,
        submission_id: &str,
        tenant_id: &str,
    ) -> impl std::future::Future<Output = SubmissionStoreResult<Option<Submission>>> + Send;

    /// Sets `is_flagged = true`. Never clears the flag.
    fn set_flagged(
        &self,
        submission_id: &str,
        tenant_id: &str,
    ) -> impl std::future::Future<Output = SubmissionStoreResult<()>> + Send;

    /// Returns the tenant's opaque settings document, if any.
    fn get_tenant_settings(
        &self,
        tenant_id: &str,
    ) -> impl std::future::Future<Output = SubmissionStoreResult<Option<Value>>> + Send;

    /// Releases pooled connections. Later calls fail with [`SubmissionStoreError::Closed`].
    fn close(&self) -> impl std::future::Future<Output = ()> + Send;
}

/// Postgres-backed [`SubmissionStore`].
///
/// Every statement runs inside a transaction that first sets `app.tenant_id`, so row-level
/// security policies on `submissions` and `tenants` apply.
#[derive(Debug, Clone)]
pub struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    /// Opens a pool and verifies one connection can be acquired.
    pub async fn connect(url: &str, max_connections: u32) -> SubmissionStoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(url)
            .await
            .map_err(|e| SubmissionStoreError::Connection {
                message: e.to_string(),
            })?;

        info!(max_connections, "Submission store connected");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin_tenant(
        &self,
        tenant_id: &str,
    ) -> SubmissionStoreResult<Transaction<'static, Postgres>> {
        if self.pool.is_closed() {
            return Err(SubmissionStoreError::Closed);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SubmissionStoreError::query("begin", e))?;

        // Equivalent to SET LOCAL, but accepts a bind parameter.
        sqlx::query("SELECT set_config('app.tenant_id', $1, true)")
            .bind(tenant_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| SubmissionStoreError::query("set_tenant", e))?;

        Ok(tx)
    }
}

impl SubmissionStore for PgSubmissionStore {
    #[instrument(skip(self))]
    async fn get_by_id(
        &self,
        submission_id: &str,
        tenant_id: &str,
    ) -> SubmissionStoreResult<Option<Submission>> {
        let mut tx = self.begin_tenant(tenant_id).await?;

        let submission = sqlx::query_as::<_, Submission>(
            "SELECT id, tenant_id, course_id, user_id, text_content, submitted_at, is_flagged \
             FROM submissions WHERE id = $1 AND tenant_id = $2",
        )
        .bind(submission_id)
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| SubmissionStoreError::query("get_by_id", e))?;

        tx.commit()
            .await
            .map_err(|e| SubmissionStoreError::query("commit", e))?;
        Ok(submission)
    }

    async fn set_flagged(&self, submission_id: &str, tenant_id: &str) -> SubmissionStoreResult<()> {
        let mut tx = self.begin_tenant(tenant_id).await?;

        let result = sqlx::query(
            "UPDATE submissions SET is_flagged = TRUE WHERE id = $1 AND tenant_id = $2",
        )
        .bind(submission_id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| SubmissionStoreError::query("set_flagged", e))?;

        tx.commit()
            .await
            .map_err(|e| SubmissionStoreError::query("commit", e))?;

        debug!(rows = result.rows_affected(), "Submission flag written");
        Ok(())
    }

    async fn get_tenant_settings(&self, tenant_id: &str) -> SubmissionStoreResult<Option<Value>> {
        let mut tx = self.begin_tenant(tenant_id).await?;

        let settings: Option<Option<Value>> =
            sqlx::query_scalar("SELECT settings FROM tenants WHERE id = $1")
                .bind(tenant_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| SubmissionStoreError::query("get_tenant_settings", e))?;

        tx.commit()
            .await
            .map_err(|e| SubmissionStoreError::query("commit", e))?;
        Ok(settings.flatten())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Submission store closed");
    }
}
