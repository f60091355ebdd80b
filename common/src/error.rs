//! Error taxonomy shared by every layer.
//!
//! Parse and config errors stop work before a sweep starts. [`ProbeFailure`] is data
//! carried inside a probe result. [`SweepError`] is the only failure that ends a sweep early.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid format '{input}': {reason}")]
    InvalidFormat { input: String, reason: &'static str },
}

impl ParseError {
    pub(crate) fn invalid(input: &str, reason: &'static str) -> Self {
        ParseError::InvalidFormat {
            input: input.to_string(),
            reason,
        }
    }
}

/// Why a single probe produced no determination.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("probe timed out")]
    Timeout,
    #[error("probe cancelled")]
    Cancelled,
    #[error("collaborator error: {0}")]
    Collaborator(String),
    /// The backend itself cannot run; escalated to a [`SweepError`].
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SweepError {
    #[error("scan backend unavailable: {0}")]
    CollaboratorUnavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("concurrency must not exceed {0}")]
    ConcurrencyTooHigh(usize),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("rate limit must be at least 1 probe per second")]
    ZeroRate,
    #[error("host expansion cap must be at least 1")]
    ZeroHostCap,
}
