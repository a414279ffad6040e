//! Job model: what clients submit and workers execute.

mod types;

pub use types::{ItemKind, Job, JobId, JobStage, PriorityClass};
