use std::fmt;

/// Step at which a submission was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStage {
    Load,
    Embed,
    Search,
    Persist,
}

impl DetectionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionStage::Load => "load",
            DetectionStage::Embed => "embed",
            DetectionStage::Search => "search",
            DetectionStage::Persist => "persist",
        }
    }
}

impl fmt::Display for DetectionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of processing one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    /// The submission does not exist under the given tenant.
    NotFound,
    /// A step failed; nothing after it ran. Redelivery retries the whole submission.
    Dropped {
        stage: DetectionStage,
        reason: String,
    },
    /// The embedding record was written.
    Scored {
        highest_similarity: f32,
        threshold: f32,
        is_flagged: bool,
        /// `false` when the submission should be flagged but the flag write failed.
        flag_persisted: bool,
    },
}

impl DetectionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DetectionOutcome::NotFound => "not_found",
            DetectionOutcome::Dropped { .. } => "dropped",
            DetectionOutcome::Scored { .. } => "scored",
        }
    }

    pub fn is_flagged(&self) -> bool {
        matches!(
            self,
            DetectionOutcome::Scored {
                is_flagged: true,
                ..
            }
        )
    }

    pub fn highest_similarity(&self) -> Option<f32> {
        match self {
            DetectionOutcome::Scored {
                highest_similarity,
                ..
            } => Some(*highest_similarity),
            _ => None,
        }
    }
}

/// Counters kept by the consumer loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub received: u64,
    pub malformed: u64,
    pub not_found: u64,
    pub dropped: u64,
    pub scored: u64,
    pub flagged: u64,
}

impl ConsumerStats {
    pub(crate) fn record(&mut self, outcome: &DetectionOutcome) {
        match outcome {
            DetectionOutcome::NotFound => self.not_found += 1,
            DetectionOutcome::Dropped { .. } => self.dropped += 1,
            DetectionOutcome::Scored { is_flagged, .. } => {
                self.scored += 1;
                if *is_flagged {
                    self.flagged += 1;
                }
            }
        }
    }
}
