//! Run registry: version allocation and live run state.
//!
//! Version allocation is the one piece of cross-run shared mutable state;
//! bumps are read-modify-write under a lock so concurrent submissions for
//! the same job kind can never claim the same version. The registry also
//! keeps every run's state and answers queries by run id.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::domain::model::{CompletionState, JobOutcome, RunId, RunRecord, Version};
use crate::error::{AllocationError, AllocationResult};

/// How a submission picks its run version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionPolicy {
    /// Use exactly this version; conflicts with an already-claimed one.
    Explicit(Version),
    /// Increment the major component of the highest existing version.
    BumpMajor,
    /// Increment the minor component of the highest existing version.
    BumpMinor,
    /// Keep the current version and distinguish runs by wall-clock stamp.
    Timestamp,
}

/// Live state of one run. Leaves merge outcomes in concurrently; each
/// `sort_index` is written exactly once. Terminal state is published on a
/// watch channel that result handles wait on.
pub(crate) struct RunState {
    run_id: RunId,
    created_at: DateTime<Utc>,
    expected: usize,
    outcomes: Mutex<BTreeMap<usize, JobOutcome>>,
    status_tx: watch::Sender<CompletionState>,
    cancelled: AtomicBool,
}

impl RunState {
    pub(crate) fn new(run_id: RunId, expected: usize) -> (Arc<Self>, watch::Receiver<CompletionState>) {
        let (status_tx, status_rx) = watch::channel(CompletionState::Pending);
        let state = Arc::new(Self {
            run_id,
            created_at: Utc::now(),
            expected,
            outcomes: Mutex::new(BTreeMap::new()),
            status_tx,
            cancelled: AtomicBool::new(false),
        });
        (state, status_rx)
    }

    pub(crate) fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Mark the run cancelled. Already-dispatched executions finish on
    /// their own; their merges are discarded.
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
        self.status_tx.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = CompletionState::Cancelled;
                true
            }
        });
    }

    /// Merge a leaf's outcomes. Pure aggregation keyed by `sort_index`;
    /// a second write to an index is a broken partition invariant and
    /// fails the run.
    pub(crate) fn merge_leaf(
        &self,
        leaf: BTreeMap<usize, JobOutcome>,
    ) -> AllocationResult<()> {
        if self.is_cancelled() {
            tracing::debug!(run_id = %self.run_id, "discarding leaf results after cancellation");
            return Ok(());
        }
        let mut outcomes = self.outcomes.lock();
        for (sort_index, outcome) in leaf {
            if outcomes.insert(sort_index, outcome).is_some() {
                drop(outcomes);
                tracing::error!(
                    run_id = %self.run_id,
                    sort_index,
                    "sort_index merged twice; partition invariant broken"
                );
                self.fail();
                return Err(AllocationError::Internal(format!(
                    "sort_index {} merged twice in run {}",
                    sort_index, self.run_id
                )));
            }
        }
        Ok(())
    }

    /// Record an execution error for every index in `indices` that has no
    /// outcome yet. Used when a subtree task dies without reporting.
    pub(crate) fn fill_missing(&self, indices: impl IntoIterator<Item = usize>, message: &str) {
        if self.is_cancelled() {
            return;
        }
        let mut outcomes = self.outcomes.lock();
        for sort_index in indices {
            outcomes.entry(sort_index).or_insert_with(|| {
                JobOutcome::Error(crate::domain::model::OutcomeError {
                    sort_index,
                    kind: crate::error::ErrorKind::Execution,
                    message: message.to_string(),
                })
            });
        }
    }

    /// Publish the terminal state once every leaf has reported.
    pub(crate) fn finalize(&self) {
        if self.is_cancelled() {
            return;
        }
        let outcomes = self.outcomes.lock();
        let all_succeeded = outcomes.len() == self.expected
            && outcomes.values().all(JobOutcome::is_success);
        let state = if all_succeeded {
            CompletionState::Complete
        } else {
            CompletionState::Partial
        };
        drop(outcomes);
        self.transition(state);
    }

    /// Terminal failure: the whole input was rejected before dispatch, or
    /// an internal invariant broke.
    pub(crate) fn fail(&self) {
        self.transition(CompletionState::Failed);
    }

    fn transition(&self, state: CompletionState) {
        self.status_tx.send_if_modified(|current| {
            if current.is_terminal() {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    pub(crate) fn completion_state(&self) -> CompletionState {
        *self.status_tx.borrow()
    }

    /// Point-in-time copy of the run record.
    pub(crate) fn snapshot(&self) -> RunRecord {
        RunRecord {
            run_id: self.run_id.clone(),
            job_kind: self.run_id.job_kind().to_string(),
            version: self.run_id.version(),
            created_at: self.created_at,
            completion_state: self.completion_state(),
            outcomes: self.outcomes.lock().clone(),
        }
    }
}

/// Registry of runs and per-kind version history.
pub struct RunRegistry {
    claimed: Mutex<HashMap<String, BTreeSet<Version>>>,
    runs: DashMap<String, Arc<RunState>>,
    seq: AtomicU64,
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RunRegistry {
    pub fn new() -> Self {
        Self {
            claimed: Mutex::new(HashMap::new()),
            runs: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    /// Allocate a new run identifier under the given version policy.
    pub fn new_run(&self, job_kind: &str, policy: VersionPolicy) -> AllocationResult<RunId> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let mut claimed = self.claimed.lock();
        let versions = claimed.entry(job_kind.to_string()).or_default();
        let highest = versions.iter().next_back().copied();

        let (version, stamp) = match policy {
            VersionPolicy::Explicit(version) => {
                if versions.contains(&version) {
                    return Err(AllocationError::VersionConflict {
                        job_kind: job_kind.to_string(),
                        version,
                    });
                }
                versions.insert(version);
                (version, format!("{:06}", seq))
            }
            VersionPolicy::BumpMajor => {
                let version = highest.map(Version::bump_major).unwrap_or(Version::new(1, 0));
                versions.insert(version);
                (version, format!("{:06}", seq))
            }
            VersionPolicy::BumpMinor => {
                let version = highest.map(Version::bump_minor).unwrap_or(Version::new(0, 1));
                versions.insert(version);
                (version, format!("{:06}", seq))
            }
            VersionPolicy::Timestamp => {
                // The stamp distinguishes runs; the version is not re-claimed.
                // Same-second submissions are disambiguated by the counter.
                let version = highest.unwrap_or(Version::new(1, 0));
                let stamp = format!("{}-{:06}", Utc::now().format("%Y-%m-%d_%H-%M-%S"), seq);
                (version, stamp)
            }
        };

        Ok(RunId::new(job_kind, version, stamp))
    }

    pub(crate) fn insert(&self, state: Arc<RunState>) {
        self.runs.insert(state.run_id().to_string(), state);
    }

    /// Snapshot of a run's record, queryable by run id.
    pub fn run_record(&self, run_id: &str) -> AllocationResult<RunRecord> {
        self.runs
            .get(run_id)
            .map(|state| state.snapshot())
            .ok_or_else(|| AllocationError::RunNotFound(run_id.to_string()))
    }
}
