//! Declarative schemas and the spec validator.

pub mod types;
pub mod validate;

pub use types::{ExperimentSchema, ExperimentSchemaBuilder, FieldConstraint, FieldSchema};
pub use validate::validate_record;
