use crate::detection::{ConsumerStats, DetectionError};

/// How the consumer task ended, as observed during shutdown.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumerExit {
    /// No consumer was ever started.
    NotStarted,
    Finished(ConsumerStats),
    Fatal(DetectionError),
    /// The task panicked or was cancelled.
    Aborted { reason: String },
}

impl ConsumerExit {
    /// `true` when the process should exit non-zero.
    pub fn is_failure(&self) -> bool {
        matches!(self, ConsumerExit::Fatal(_) | ConsumerExit::Aborted { .. })
    }
}
