pub mod runner;

pub use crate::application::allocation_run::RunHandle;
pub use runner::{AllocationRunner, SubmissionBuilder};
