//! High-level allocation runner and submission builder.
//!
//! [`AllocationRunner`] wires the experiment registry, the run registry,
//! and the artifact gateway together. Each submission is configured
//! through a [`SubmissionBuilder`] and returns a
//! [`RunHandle`](crate::application::allocation_run::RunHandle)
//! synchronously, before execution completes.

use std::sync::Arc;

use crate::application::allocation_run::{submit, RunHandle, SubmissionRequest};
use crate::core::artifact::{ArtifactGateway, ObjectStore, RetrySettings};
use crate::core::planner::RecursionLimits;
use crate::core::run_registry::{RunRegistry, VersionPolicy};
use crate::domain::model::{RawRecord, RunRecord};
use crate::error::AllocationResult;
use crate::experiments::ExperimentRegistry;

pub struct AllocationRunner {
    experiments: Arc<ExperimentRegistry>,
    runs: Arc<RunRegistry>,
    gateway: ArtifactGateway,
}

impl AllocationRunner {
    pub fn new(experiments: Arc<ExperimentRegistry>, store: Arc<dyn ObjectStore>) -> Self {
        Self::with_retry_settings(experiments, store, RetrySettings::default())
    }

    /// Construct with explicit artifact retry behavior.
    pub fn with_retry_settings(
        experiments: Arc<ExperimentRegistry>,
        store: Arc<dyn ObjectStore>,
        retry: RetrySettings,
    ) -> Self {
        Self {
            experiments,
            runs: Arc::new(RunRegistry::new()),
            gateway: ArtifactGateway::new(store, retry),
        }
    }

    /// Start building a submission for the given job kind.
    pub fn submission(&self, job_kind: &str) -> SubmissionBuilder<'_> {
        let limits = RecursionLimits::default();
        SubmissionBuilder {
            runner: self,
            job_kind: job_kind.to_string(),
            records: Vec::new(),
            factor: limits.factor,
            max_depth: limits.max_depth,
            version_policy: VersionPolicy::Timestamp,
        }
    }

    /// The run registry, for version allocation and run-record queries
    /// independent of any submission.
    pub fn run_registry(&self) -> &Arc<RunRegistry> {
        &self.runs
    }

    /// Snapshot of a run's record by its id string.
    pub fn run_record(&self, run_id: &str) -> AllocationResult<RunRecord> {
        self.runs.run_record(run_id)
    }
}

/// Builder for one submission.
pub struct SubmissionBuilder<'a> {
    runner: &'a AllocationRunner,
    job_kind: String,
    records: Vec<RawRecord>,
    factor: usize,
    max_depth: u32,
    version_policy: VersionPolicy,
}

impl SubmissionBuilder<'_> {
    /// Append one raw record.
    pub fn record(mut self, record: RawRecord) -> Self {
        self.records.push(record);
        self
    }

    /// Append an ordered sequence of raw records.
    pub fn records<I: IntoIterator<Item = RawRecord>>(mut self, records: I) -> Self {
        self.records.extend(records);
        self
    }

    /// Fan-out factor: maximum children per recursion node. Must be >= 2.
    pub fn factor(mut self, factor: usize) -> Self {
        self.factor = factor;
        self
    }

    /// Recursion depth budget; at 0 remaining a node executes directly.
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn version_policy(mut self, policy: VersionPolicy) -> Self {
        self.version_policy = policy;
        self
    }

    /// Validate, allocate a versioned run, and dispatch. Returns the
    /// handle immediately; resolve it later for the merged record.
    pub async fn submit(self) -> AllocationResult<RunHandle> {
        submit(
            &self.runner.experiments,
            &self.runner.runs,
            &self.runner.gateway,
            SubmissionRequest {
                job_kind: self.job_kind,
                records: self.records,
                factor: self.factor,
                max_depth: self.max_depth,
                version_policy: self.version_policy,
            },
        )
        .await
    }
}
