//! # Sweeprun — Recursive Scatter/Gather Experiment Allocation
//!
//! `sweeprun` takes a batch of independent, schema-validated computational
//! jobs ("experiments"), partitions it into a tree of sub-batches bounded
//! by a fan-out factor and a depth budget, executes the leaves
//! concurrently, and gathers every outcome into one durable, versioned run:
//!
//! - **Declarative registration**: a job kind is registered once at startup
//!   with an input schema, an output schema, and an executable.
//! - **Spec validation**: numeric ranges, enumerated literals, and file
//!   references are checked before anything is dispatched; a bad record
//!   aborts only itself.
//! - **Bounded fan-out**: dispatch width at any node never exceeds the
//!   fan-out factor; a large batch trades breadth for tree depth.
//! - **Failure isolation**: a panicking or failing experiment is recorded
//!   against its `sort_index` and never aborts sibling specs.
//! - **Versioned runs**: explicit, bump-major/minor, or timestamp version
//!   policies, serialized so concurrent submissions never collide.
//! - **Artifact storage**: file-valued fields are resolved through an
//!   object store with reproducible `{run}/{index}/{field}` keys and
//!   bounded retry.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use sweeprun::{
//!     AllocationRunner, ExperimentRegistry, ExperimentSchema, MemoryObjectStore, RawRecord,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut experiments = ExperimentRegistry::new();
//!     experiments
//!         .register_fn(
//!             "double",
//!             ExperimentSchema::builder().integer("n", 0, 1000).build(),
//!             ExperimentSchema::builder().integer("result", 0, 2000).build(),
//!             |spec, _ctx| async move {
//!                 let n = spec.get("n").and_then(|v| v.as_integer()).unwrap_or(0);
//!                 let mut out = RawRecord::new();
//!                 out.insert("result".into(), json!(n * 2));
//!                 Ok(out)
//!             },
//!         )
//!         .unwrap();
//!
//!     let runner = AllocationRunner::new(Arc::new(experiments), Arc::new(MemoryObjectStore::new()));
//!     let handle = runner
//!         .submission("double")
//!         .records((0..100).map(|n| {
//!             let mut record = RawRecord::new();
//!             record.insert("n".into(), json!(n));
//!             record
//!         }))
//!         .factor(2)
//!         .max_depth(2)
//!         .submit()
//!         .await
//!         .unwrap();
//!
//!     println!("{}", handle.run_id());
//!     let record = handle.result().await;
//!     println!("{:?}", record.completion_state);
//! }
//! ```

pub mod core;
pub mod domain;
pub mod error;
pub mod experiments;
pub mod schema;

pub mod api;
pub mod application;

pub use crate::api::{AllocationRunner, RunHandle, SubmissionBuilder};
pub use crate::core::{
    leaf_ranges, ArtifactGateway, FileObjectStore, MemoryObjectStore, ObjectStore,
    RecursionLimits, RetrySettings, RunRegistry, StoreError, VersionPolicy,
};
pub use crate::domain::model::{
    CompletionState, ExecutionMetrics, FieldValue, FileReference, JobOutcome, JobOutput, JobSpec,
    OutcomeError, RawRecord, RunId, RunRecord, Version,
};
pub use crate::error::{
    AllocationError, AllocationResult, ErrorKind, ErrorRetryability, SpecError, SpecResult,
};
pub use crate::experiments::{
    Experiment, ExperimentContext, ExperimentEntry, ExperimentRegistry, FnExperiment,
};
pub use crate::schema::{
    validate_record, ExperimentSchema, ExperimentSchemaBuilder, FieldConstraint, FieldSchema,
};
