use thiserror::Error;

/// Reasons a bus message is rejected before it reaches detection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("event payload is empty")]
    Empty,

    #[error("event payload is not valid UTF-8: {reason}")]
    InvalidUtf8 { reason: String },

    #[error("event payload is not a JSON object: {reason}")]
    InvalidJson { reason: String },

    /// Field absent, not a string, or empty.
    #[error("event field '{field}' is missing or empty")]
    MissingField { field: &'static str },
}

/// Errors returned when feeding a [`super::ChannelPublisher`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PublishError {
    #[error("subscription is closed")]
    Closed,
}
