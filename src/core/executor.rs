//! Per-spec execution.
//!
//! Runs one registered experiment against one validated spec. The
//! experiment future is spawned on its own task so a panic inside
//! experiment code becomes an execution-error outcome for that
//! `sort_index` instead of a process fault. Wall-clock duration and a
//! fresh execution id are stamped on every successful output.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use super::artifact::ArtifactGateway;
use crate::domain::model::{
    ExecutionMetrics, FieldValue, FileReference, JobOutcome, JobOutput, JobSpec, OutcomeError,
};
use crate::error::{SpecError, SpecResult};
use crate::experiments::{ExperimentContext, ExperimentEntry};
use crate::schema::validate_record;

pub struct ExperimentExecutor {
    gateway: ArtifactGateway,
}

impl ExperimentExecutor {
    pub fn new(gateway: ArtifactGateway) -> Self {
        Self { gateway }
    }

    /// Execute one spec to an outcome. Never returns an error: every
    /// failure is folded into a [`JobOutcome::Error`] tagged with the
    /// spec's `sort_index`.
    pub async fn execute(&self, entry: &Arc<ExperimentEntry>, spec: &JobSpec) -> JobOutcome {
        let sort_index = spec.sort_index();
        match self.try_execute(entry, spec).await {
            Ok(output) => JobOutcome::Success(output),
            Err(error) => {
                tracing::debug!(
                    run_id = %spec.experiment_id(),
                    sort_index,
                    "spec execution failed: {}",
                    error
                );
                JobOutcome::Error(OutcomeError::from_spec_error(sort_index, &error))
            }
        }
    }

    async fn try_execute(
        &self,
        entry: &Arc<ExperimentEntry>,
        spec: &JobSpec,
    ) -> SpecResult<JobOutput> {
        let spec = self.resolve_input_files(spec).await?;

        let scratch = tempfile::tempdir()
            .map_err(|e| SpecError::Execution(format!("failed to create scratch dir: {}", e)))?;
        let ctx = ExperimentContext::new(
            spec.experiment_id().clone(),
            spec.sort_index(),
            scratch.path().to_path_buf(),
            self.gateway.clone(),
        );

        let started_at = Utc::now();
        let started = Instant::now();
        let execution_id = Uuid::new_v4().to_string();

        let experiment = Arc::clone(&entry.experiment);
        let task_spec = spec.clone();
        let task_ctx = ctx.clone();
        let joined =
            tokio::spawn(async move { experiment.run(&task_spec, &task_ctx).await }).await;

        let raw_output = match joined {
            Ok(result) => result?,
            Err(join_error) if join_error.is_panic() => {
                return Err(SpecError::Panic(join_error.to_string()));
            }
            Err(join_error) => {
                return Err(SpecError::Execution(format!(
                    "experiment task failed: {}",
                    join_error
                )));
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let fields = validate_record(&raw_output, &entry.output_schema)?;
        let fields = self.upload_output_files(&spec, fields).await?;

        Ok(JobOutput {
            sort_index: spec.sort_index(),
            fields,
            metrics: ExecutionMetrics {
                execution_id,
                started_at,
                duration_ms,
            },
        })
    }

    /// Upload local input file fields and rewrite them to storage keys, so
    /// the executed spec references durable artifacts only.
    async fn resolve_input_files(&self, spec: &JobSpec) -> SpecResult<JobSpec> {
        let mut resolved = spec.clone();
        for (name, value) in spec.fields() {
            if let FieldValue::File(FileReference::Local(path)) = value {
                let bytes = tokio::fs::read(path).await.map_err(|e| {
                    SpecError::Execution(format!("failed to read {}: {}", path.display(), e))
                })?;
                let key = ArtifactGateway::logical_key(spec.experiment_id(), spec.sort_index(), name);
                let key = self.gateway.put(&bytes, &key).await?;
                resolved = resolved.with_field(name, FieldValue::File(FileReference::Stored(key)));
            }
        }
        Ok(resolved)
    }

    async fn upload_output_files(
        &self,
        spec: &JobSpec,
        fields: HashMap<String, FieldValue>,
    ) -> SpecResult<HashMap<String, FieldValue>> {
        let mut uploaded = HashMap::with_capacity(fields.len());
        for (name, value) in fields {
            let value = match value {
                FieldValue::File(FileReference::Local(path)) => {
                    let bytes = tokio::fs::read(&path).await.map_err(|e| {
                        SpecError::Execution(format!("failed to read {}: {}", path.display(), e))
                    })?;
                    let key =
                        ArtifactGateway::logical_key(spec.experiment_id(), spec.sort_index(), &name);
                    let key = self.gateway.put(&bytes, &key).await?;
                    FieldValue::File(FileReference::Stored(key))
                }
                other => other,
            };
            uploaded.insert(name, value);
        }
        Ok(uploaded)
    }
}
