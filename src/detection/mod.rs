//! Plagiarism detection: the per-submission workflow and the consumer loop feeding it.

mod consumer;
mod detector;
mod error;
mod outcome;

#[cfg(test)]
mod tests;

pub use consumer::{Consumer, ConsumerStop};
pub use detector::{Detector, DetectorConfig};
pub use error::DetectionError;
pub use outcome::{ConsumerStats, DetectionOutcome, DetectionStage};
