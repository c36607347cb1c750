//! Tenant-scoped submission and settings access.

mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod model;
pub mod store;

#[cfg(test)]
mod tests;

pub use error::{SubmissionStoreError, SubmissionStoreResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockSubmissionStore, fixture_submission};
pub use model::Submission;
pub use store::{PgSubmissionStore, SubmissionStore};
