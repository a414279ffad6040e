//! Testing utilities and mock implementations.
//!
//! `MockExecutor` stands in for the job body so tests can control timing,
//! inject failures and observe how many jobs overlap at the station.
//!
//! # Example
//!
//! ```rust,ignore
//! use kitchen_core::testing::{fixtures, MockExecutor};
//!
//! let executor = MockExecutor::new().with_duration(Duration::from_secs(1));
//! let dispatcher = Dispatcher::start(fixtures::fast_config(1), Arc::new(executor.clone()))?;
//! ```

mod mock_executor;

pub use mock_executor::MockExecutor;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::config::DispatcherConfig;
    use crate::job::{ItemKind, Job, PriorityClass};

    /// Dispatcher config with `workers` workers and a 1 ms time unit.
    pub fn fast_config(workers: usize) -> DispatcherConfig {
        DispatcherConfig::default()
            .with_workers(workers)
            .with_execution_units(1)
            .with_time_unit_ms(1)
    }

    /// A Burger job for `station_id`.
    pub fn burger(station_id: u32, priority: PriorityClass) -> Job {
        Job::new(station_id, ItemKind::Burger, priority)
    }

    /// A Steak job for `station_id`.
    pub fn steak(station_id: u32, priority: PriorityClass) -> Job {
        Job::new(station_id, ItemKind::Steak, priority)
    }
}
