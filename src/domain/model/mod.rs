//! Domain model: validated specs, outputs, and run records.

pub mod output;
pub mod run;
pub mod spec;

pub use output::{ExecutionMetrics, JobOutcome, JobOutput, OutcomeError};
pub use run::{CompletionState, RunId, RunRecord, Version};
pub use spec::{FieldValue, FileReference, JobSpec, RawRecord};
