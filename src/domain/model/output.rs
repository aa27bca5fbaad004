use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::spec::FieldValue;
use crate::error::{ErrorKind, SpecError};

/// Engine-stamped metrics for one execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    /// Unique id of this execution attempt.
    pub execution_id: String,
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the experiment call.
    pub duration_ms: u64,
}

/// Typed output of one successful execution. Carries the same `sort_index`
/// as its originating spec so it merges back without content matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutput {
    pub sort_index: usize,
    pub fields: HashMap<String, FieldValue>,
    pub metrics: ExecutionMetrics,
}

/// Structured failure recorded against one `sort_index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeError {
    pub sort_index: usize,
    pub kind: ErrorKind,
    pub message: String,
}

impl OutcomeError {
    pub fn from_spec_error(sort_index: usize, error: &SpecError) -> Self {
        Self {
            sort_index,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Outcome of one spec: a typed output or a structured error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Success(JobOutput),
    Error(OutcomeError),
}

impl JobOutcome {
    pub fn sort_index(&self) -> usize {
        match self {
            JobOutcome::Success(output) => output.sort_index,
            JobOutcome::Error(error) => error.sort_index,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success(_))
    }

    pub fn output(&self) -> Option<&JobOutput> {
        match self {
            JobOutcome::Success(output) => Some(output),
            JobOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&OutcomeError> {
        match self {
            JobOutcome::Success(_) => None,
            JobOutcome::Error(error) => Some(error),
        }
    }
}
