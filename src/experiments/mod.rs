//! Experiment trait and registry.
//!
//! A job kind is a registered category of computation: an input schema, an
//! output schema, and an executable. Registration is declarative, done once
//! at process start; the planner only ever looks kinds up.

pub mod registry;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::core::artifact::ArtifactGateway;
use crate::domain::model::{FileReference, JobSpec, RawRecord, RunId};
use crate::error::{SpecError, SpecResult};

pub use registry::{ExperimentEntry, ExperimentRegistry};

/// Per-execution context handed to an experiment: a scratch directory for
/// intermediate files and access to the artifact store for file fields.
#[derive(Clone)]
pub struct ExperimentContext {
    run_id: RunId,
    sort_index: usize,
    scratch_dir: PathBuf,
    gateway: ArtifactGateway,
}

impl ExperimentContext {
    pub(crate) fn new(
        run_id: RunId,
        sort_index: usize,
        scratch_dir: PathBuf,
        gateway: ArtifactGateway,
    ) -> Self {
        Self {
            run_id,
            sort_index,
            scratch_dir,
            gateway,
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn sort_index(&self) -> usize {
        self.sort_index
    }

    /// Scratch directory for this execution. Removed after the run; files
    /// named in output fields are uploaded before removal.
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Read the bytes behind a file field, from disk or the object store.
    pub async fn fetch(&self, file: &FileReference) -> SpecResult<Vec<u8>> {
        match file {
            FileReference::Local(path) => tokio::fs::read(path).await.map_err(|e| {
                SpecError::Execution(format!("failed to read {}: {}", path.display(), e))
            }),
            FileReference::Stored(key) => self.gateway.get(key).await,
        }
    }
}

/// One registered computation. Receives a validated spec and returns a raw
/// output record, which the executor validates against the registered
/// output schema. File-valued output fields may name paths under
/// [`ExperimentContext::scratch_dir`]; they are uploaded afterwards.
#[async_trait]
pub trait Experiment: Send + Sync {
    async fn run(&self, spec: &JobSpec, ctx: &ExperimentContext) -> SpecResult<RawRecord>;
}

type ExperimentFn =
    Arc<dyn Fn(JobSpec, ExperimentContext) -> BoxFuture<'static, SpecResult<RawRecord>> + Send + Sync>;

/// Adapter turning a plain async closure into an [`Experiment`].
pub struct FnExperiment {
    function: ExperimentFn,
}

impl FnExperiment {
    pub fn new<F, Fut>(function: F) -> Self
    where
        F: Fn(JobSpec, ExperimentContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SpecResult<RawRecord>> + Send + 'static,
    {
        Self {
            function: Arc::new(move |spec, ctx| Box::pin(function(spec, ctx))),
        }
    }
}

#[async_trait]
impl Experiment for FnExperiment {
    async fn run(&self, spec: &JobSpec, ctx: &ExperimentContext) -> SpecResult<RawRecord> {
        (self.function)(spec.clone(), ctx.clone()).await
    }
}
