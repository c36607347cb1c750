//! Configuration error types.

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Port value is outside valid range (1-65535).
    #[error("invalid port '{value}': must be between 1 and 65535")]
    InvalidPort { value: String },

    /// Port string could not be parsed as a number.
    #[error("failed to parse port '{value}': {source}")]
    PortParseError {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Bind address string could not be parsed.
    #[error("failed to parse bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// A numeric setting could not be parsed.
    #[error("failed to parse {name}='{value}' as a number")]
    InvalidNumber { name: &'static str, value: String },

    /// The default plagiarism threshold is outside `[0, 1]`.
    #[error("default threshold {value} must be within [0, 1]")]
    ThresholdOutOfRange { value: f32 },

    /// A setting that must be positive was zero.
    #[error("{name} must be greater than zero")]
    MustBePositive { name: &'static str },

    /// A setting exceeded its documented ceiling.
    #[error("{name}={value} exceeds the maximum of {max}")]
    AboveMaximum {
        name: &'static str,
        value: u64,
        max: u64,
    },

    /// A URL setting was empty.
    #[error("{name} cannot be empty")]
    EmptyUrl { name: &'static str },
}
