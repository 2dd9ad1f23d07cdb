//! Error types for event synchronization.

use std::fmt;
use thiserror::Error;

/// Main error type for synchronization operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    MalformedEvent(#[from] MalformedEventError),

    #[error("Subscription already terminated")]
    SubscriptionTerminated,

    #[error("Invalid collection path: {0:?}")]
    InvalidPath(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

/// Why a field failed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MalformedReason {
    /// Required field is absent (or null).
    Missing,
    /// Field is present but has the wrong JSON type.
    WrongType { expected: &'static str },
    /// Field is a string outside its closed vocabulary.
    UnknownVariant { value: String },
    /// Field contradicts another field (e.g. `resolvedAt` on an unresolved event).
    Inconsistent,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::Missing => write!(f, "missing"),
            MalformedReason::WrongType { expected } => write!(f, "expected {}", expected),
            MalformedReason::UnknownVariant { value } => write!(f, "unknown value {:?}", value),
            MalformedReason::Inconsistent => write!(f, "inconsistent with resolution state"),
        }
    }
}

/// A raw record could not be converted into an [`Event`](crate::Event).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("Malformed event field `{field}`: {reason}")]
pub struct MalformedEventError {
    pub field: String,
    pub reason: MalformedReason,
}

impl MalformedEventError {
    pub fn missing(field: &str) -> Self {
        Self {
            field: field.to_string(),
            reason: MalformedReason::Missing,
        }
    }

    pub fn wrong_type(field: &str, expected: &'static str) -> Self {
        Self {
            field: field.to_string(),
            reason: MalformedReason::WrongType { expected },
        }
    }

    pub fn unknown_variant(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            reason: MalformedReason::UnknownVariant {
                value: value.to_string(),
            },
        }
    }

    pub fn inconsistent(field: &str) -> Self {
        Self {
            field: field.to_string(),
            reason: MalformedReason::Inconsistent,
        }
    }
}

/// Result type for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;
