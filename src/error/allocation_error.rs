//! Allocation-level error types.

use thiserror::Error;

use super::SpecError;
use crate::domain::model::Version;

/// Errors that reject a submission or fail a run as a whole.
#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("Planning error: {0}")]
    Planning(String),
    #[error("Unknown job kind: {0}")]
    UnknownJobKind(String),
    #[error("Duplicate job kind: {0}")]
    DuplicateJobKind(String),
    #[error("Version conflict for job kind '{job_kind}': version {version} already claimed")]
    VersionConflict { job_kind: String, version: Version },
    #[error("Run not found: {0}")]
    RunNotFound(String),
    #[error("Empty submission: no records provided")]
    EmptySubmission,
    #[error("Result not ready within timeout")]
    ResultTimeout,
    #[error("Spec error: {0}")]
    Spec(Box<SpecError>),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SpecError> for AllocationError {
    fn from(value: SpecError) -> Self {
        AllocationError::Spec(Box::new(value))
    }
}

/// Convenience alias for allocation-level results.
pub type AllocationResult<T> = Result<T, AllocationError>;
