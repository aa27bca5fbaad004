//! Error types for the allocation engine.
//!
//! - [`SpecError`] — Errors scoped to one spec (validation, execution, storage).
//! - [`AllocationError`] — Top-level errors for submission, versioning, and runs.
//! - [`ErrorKind`] — Structured error classification carried by run outcomes.

pub mod allocation_error;
pub mod error_context;
pub mod spec_error;

pub use allocation_error::{AllocationError, AllocationResult};
pub use error_context::{ErrorKind, ErrorRetryability};
pub use spec_error::SpecError;

/// Convenience alias for spec-level results.
pub type SpecResult<T> = Result<T, SpecError>;
