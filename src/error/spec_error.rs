use serde_json::Value;
use thiserror::Error;

use super::{ErrorKind, ErrorRetryability};

/// Errors scoped to a single spec. These never abort sibling specs; the
/// planner records them against the failing `sort_index`.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("Validation error: field '{field}' {constraint}, got {value}")]
    Validation {
        field: String,
        constraint: String,
        value: Value,
    },
    #[error("Execution error: {0}")]
    Execution(String),
    #[error("Experiment panicked: {0}")]
    Panic(String),
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        retryability: ErrorRetryability,
    },
}

impl SpecError {
    pub fn storage_retryable(message: impl Into<String>) -> Self {
        SpecError::Storage {
            message: message.into(),
            retryability: ErrorRetryability::Retryable,
        }
    }

    pub fn storage_fatal(message: impl Into<String>) -> Self {
        SpecError::Storage {
            message: message.into(),
            retryability: ErrorRetryability::NonRetryable,
        }
    }

    /// Classification used when this error is recorded as a run outcome.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SpecError::Validation { .. } => ErrorKind::Validation,
            SpecError::Execution(_) | SpecError::Panic(_) => ErrorKind::Execution,
            SpecError::Storage { .. } => ErrorKind::Storage,
        }
    }
}
