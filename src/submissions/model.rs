use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A student submission as stored by the surrounding platform.
///
/// Only `is_flagged` is ever written by this crate, and only from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Submission {
    pub id: String,
    pub tenant_id: String,
    pub course_id: String,
    pub user_id: String,
    pub text_content: String,
    pub submitted_at: DateTime<Utc>,
    pub is_flagged: bool,
}
