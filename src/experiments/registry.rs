use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use super::{Experiment, ExperimentContext, FnExperiment};
use crate::domain::model::{JobSpec, RawRecord};
use crate::error::{AllocationError, AllocationResult, SpecResult};
use crate::schema::ExperimentSchema;

/// One registered job kind: schema pair plus executable.
pub struct ExperimentEntry {
    pub job_kind: String,
    pub input_schema: ExperimentSchema,
    pub output_schema: ExperimentSchema,
    pub experiment: Arc<dyn Experiment>,
}

/// Lookup table from job kind to its entry. Populated once during
/// initialization; duplicate registration of the same kind is an error.
#[derive(Default)]
pub struct ExperimentRegistry {
    entries: HashMap<String, Arc<ExperimentEntry>>,
}

impl ExperimentRegistry {
    pub fn new() -> Self {
        ExperimentRegistry {
            entries: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        job_kind: &str,
        input_schema: ExperimentSchema,
        output_schema: ExperimentSchema,
        experiment: Arc<dyn Experiment>,
    ) -> AllocationResult<()> {
        if self.entries.contains_key(job_kind) {
            return Err(AllocationError::DuplicateJobKind(job_kind.to_string()));
        }
        self.entries.insert(
            job_kind.to_string(),
            Arc::new(ExperimentEntry {
                job_kind: job_kind.to_string(),
                input_schema,
                output_schema,
                experiment,
            }),
        );
        Ok(())
    }

    /// Register a plain async closure as an experiment.
    pub fn register_fn<F, Fut>(
        &mut self,
        job_kind: &str,
        input_schema: ExperimentSchema,
        output_schema: ExperimentSchema,
        function: F,
    ) -> AllocationResult<()>
    where
        F: Fn(JobSpec, ExperimentContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SpecResult<RawRecord>> + Send + 'static,
    {
        self.register(
            job_kind,
            input_schema,
            output_schema,
            Arc::new(FnExperiment::new(function)),
        )
    }

    pub fn lookup(&self, job_kind: &str) -> Option<Arc<ExperimentEntry>> {
        self.entries.get(job_kind).cloned()
    }

    pub fn registered_kinds(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
