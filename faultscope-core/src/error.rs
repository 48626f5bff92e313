use std::time::Duration;

use thiserror::Error;

/// Failure of a single model invocation, classified for the fallback policy.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("model rate limited: {0}")]
    RateLimited(String),
    #[error("transient model failure: {0}")]
    Transient(String),
    #[error("fatal model failure: {0}")]
    Fatal(String),
}

impl ModelError {
    /// Whether the orchestrator may move on to the next model.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ModelError::RateLimited(_) | ModelError::Transient(_))
    }

    pub fn timed_out(after: Duration) -> Self {
        ModelError::Transient(format!("attempt timed out after {after:?}"))
    }
}

/// Model output that does not satisfy the diagnosis contract.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("malformed model output: {reason}")]
    MalformedOutput { reason: String },
    #[error("incomplete model output, missing {}", missing.join(", "))]
    IncompleteOutput { missing: Vec<String> },
    #[error("invalid value '{value}' for '{field}', expected one of {}", allowed.join("|"))]
    InvalidEnum {
        field: String,
        value: String,
        allowed: Vec<String>,
    },
}

impl ValidationError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ValidationError::MalformedOutput {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("model identifier must not be blank")]
    BlankModel,
    #[error("temperature {0} is outside 0.0..=2.0")]
    Temperature(String),
    #[error("max output tokens must be positive")]
    MaxOutputTokens,
    #[error("attempt timeout must be positive")]
    AttemptTimeout,
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
