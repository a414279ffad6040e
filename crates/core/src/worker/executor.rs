//! The job body run while a worker holds the station.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::DispatchError;
use crate::job::Job;

/// Executes a job's body. Called with both the permit and the station held.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Returns the name of this executor implementation.
    fn name(&self) -> &str;

    /// Runs the job to completion.
    async fn execute(&self, job: &Job) -> Result<(), DispatchError>;

    /// Expected duration of one execution, stamped on tracking records.
    fn estimated_duration(&self) -> Duration;
}

/// Executor that simulates work by sleeping for a fixed duration.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    duration: Duration,
}

impl SimulatedExecutor {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Duration of `units` time units of `unit` each, saturating at `Duration::MAX`.
    pub fn from_units(units: u32, unit: Duration) -> Self {
        Self::new(unit.checked_mul(units).unwrap_or(Duration::MAX))
    }
}

#[async_trait]
impl JobExecutor for SimulatedExecutor {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn execute(&self, _job: &Job) -> Result<(), DispatchError> {
        tokio::time::sleep(self.duration).await;
        Ok(())
    }

    fn estimated_duration(&self) -> Duration {
        self.duration
    }
}
