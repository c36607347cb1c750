//! Submission-created events: payload decoding and the subscription boundary.

mod error;
mod event;
mod source;

#[cfg(test)]
mod tests;

pub use error::{EventError, PublishError};
pub use event::{SubmissionCreated, decode_event};
pub use source::{ChannelPublisher, ChannelSource, MessageSource, channel};
