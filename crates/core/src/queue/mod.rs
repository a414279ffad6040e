//! Job queue between submitters and the worker pool.
//!
//! Priority is enforced here and only here: once two jobs leave the queue,
//! nothing orders their permit or station acquisition.

mod job_queue;

pub use job_queue::{JobQueue, QueueDepths};
