//! Composition root of the engine.
//!
//! The dispatcher owns the queue, the shared resources, the stats
//! aggregator and the worker pool, and exposes the client surface:
//! - **submit**: validate and enqueue, never blocks
//! - **snapshot / status / subscribe**: observation
//! - **shutdown**: stop intake, drop what is still queued, wait for in-flight work

mod runner;
mod types;

pub use runner::Dispatcher;
pub use types::{DispatcherStatus, ShutdownReport};
