//! Worker pool and the job body abstraction.
//!
//! Each worker loops: dequeue, take an ingredient permit, take the station,
//! run the job body, release both, record the outcome.

mod executor;
mod pool;

pub use executor::{JobExecutor, SimulatedExecutor};
pub use pool::{WorkerContext, WorkerPool};
