//! Run identity, versioning, and the durable run record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::output::JobOutcome;

/// Two-component run version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    pub fn bump_major(self) -> Self {
        Self {
            major: self.major + 1,
            minor: 0,
        }
    }

    pub fn bump_minor(self) -> Self {
        Self {
            major: self.major,
            minor: self.minor + 1,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

/// Unique run identifier: job kind, version, and a distinguishing stamp
/// (sortable wall-clock string or monotonic counter).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId {
    job_kind: String,
    version: Version,
    stamp: String,
}

impl RunId {
    pub fn new(job_kind: impl Into<String>, version: Version, stamp: impl Into<String>) -> Self {
        Self {
            job_kind: job_kind.into(),
            version,
            stamp: stamp.into(),
        }
    }

    pub fn job_kind(&self) -> &str {
        &self.job_kind
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.job_kind, self.version, self.stamp)
    }
}

/// Completion state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionState {
    /// Created, leaves still outstanding.
    Pending,
    /// Every spec succeeded.
    Complete,
    /// Some specs succeeded, some failed.
    Partial,
    /// The entire input was rejected before any dispatch.
    Failed,
    /// Cancelled by the caller; late leaf results were discarded.
    Cancelled,
}

impl CompletionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CompletionState::Pending)
    }
}

/// The durable descriptor of one allocation: identity, timing, completion
/// state, and every spec's outcome keyed by `sort_index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub job_kind: String,
    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub completion_state: CompletionState,
    pub outcomes: BTreeMap<usize, JobOutcome>,
}

impl RunRecord {
    /// Outcome for one spec, if it has been recorded yet.
    pub fn outcome(&self, sort_index: usize) -> Option<&JobOutcome> {
        self.outcomes.get(&sort_index)
    }

    pub fn success_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, JobOutcome::Success(_)))
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }
}
