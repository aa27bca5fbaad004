use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::artifact::ArtifactGateway;
use crate::core::executor::ExperimentExecutor;
use crate::core::planner::{RecursionLimits, ScatterGatherPlanner};
use crate::core::run_registry::{RunRegistry, RunState, VersionPolicy};
use crate::domain::model::{JobOutcome, JobSpec, OutcomeError, RawRecord};
use crate::error::{AllocationError, AllocationResult};
use crate::experiments::ExperimentRegistry;
use crate::schema::validate_record;

use super::RunHandle;

pub(crate) struct SubmissionRequest {
    pub(crate) job_kind: String,
    pub(crate) records: Vec<RawRecord>,
    pub(crate) factor: usize,
    pub(crate) max_depth: u32,
    pub(crate) version_policy: VersionPolicy,
}

/// Validate, allocate a run id, and launch the planner task. The handle is
/// returned before any leaf finishes; the planner runs independently.
pub(crate) async fn submit(
    experiments: &Arc<ExperimentRegistry>,
    runs: &Arc<RunRegistry>,
    gateway: &ArtifactGateway,
    request: SubmissionRequest,
) -> AllocationResult<RunHandle> {
    let limits = RecursionLimits::new(request.factor, request.max_depth)?;
    let entry = experiments
        .lookup(&request.job_kind)
        .ok_or_else(|| AllocationError::UnknownJobKind(request.job_kind.clone()))?;
    if request.records.is_empty() {
        return Err(AllocationError::EmptySubmission);
    }

    let run_id = runs.new_run(&request.job_kind, request.version_policy)?;

    // Validation failures abort only their own spec, before dispatch.
    let mut specs = Vec::with_capacity(request.records.len());
    let mut rejected = BTreeMap::new();
    for (sort_index, record) in request.records.iter().enumerate() {
        match validate_record(record, &entry.input_schema) {
            Ok(fields) => specs.push(JobSpec::new(run_id.clone(), sort_index, fields)),
            Err(error) => {
                rejected.insert(
                    sort_index,
                    JobOutcome::Error(OutcomeError::from_spec_error(sort_index, &error)),
                );
            }
        }
    }

    let (state, status_rx) = RunState::new(run_id.clone(), request.records.len());
    runs.insert(Arc::clone(&state));

    if !rejected.is_empty() {
        tracing::warn!(
            run_id = %run_id,
            rejected = rejected.len(),
            total = request.records.len(),
            "records rejected by validation"
        );
        state.merge_leaf(rejected)?;
    }

    if specs.is_empty() {
        // The entire input was rejected before any dispatch.
        state.fail();
        return Ok(RunHandle::new(run_id, status_rx, state));
    }

    let executor = Arc::new(ExperimentExecutor::new(gateway.clone()));
    let planner =
        ScatterGatherPlanner::new(entry, executor, Arc::clone(&state), specs, limits);
    tokio::spawn(async move {
        if let Err(error) = planner.run().await {
            tracing::error!("allocation run failed: {}", error);
        }
    });

    Ok(RunHandle::new(run_id, status_rx, state))
}
