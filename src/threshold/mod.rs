//! Per-tenant plagiarism threshold resolution.

mod resolver;


pub use resolver::{ThresholdResolver, threshold_from_settings};
