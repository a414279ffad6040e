//! Mock job executor for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::DispatchError;
use crate::job::{Job, JobId};
use crate::worker::JobExecutor;

/// Mock implementation of the JobExecutor trait.
///
/// Provides controllable behavior for testing:
/// - Records executed jobs in start order
/// - Tracks how many executions overlap
/// - Simulates failures and panics for chosen stations
///
/// # Example
///
/// ```rust,ignore
/// use kitchen_core::testing::MockExecutor;
///
/// let executor = MockExecutor::new().with_duration(Duration::from_millis(10));
/// executor.fail_station(3);
///
/// let dispatcher = Dispatcher::start(config, Arc::new(executor.clone()))?;
/// // ...
/// assert_eq!(executor.max_concurrent(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockExecutor {
    duration: Duration,
    executed: Arc<Mutex<Vec<Job>>>,
    failing_stations: Arc<Mutex<HashSet<u32>>>,
    panicking_stations: Arc<Mutex<HashSet<u32>>>,
    running: Arc<AtomicUsize>,
    max_running: Arc<AtomicUsize>,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockExecutor {
    /// Create a mock executor that finishes immediately.
    pub fn new() -> Self {
        Self {
            duration: Duration::ZERO,
            executed: Arc::new(Mutex::new(Vec::new())),
            failing_stations: Arc::new(Mutex::new(HashSet::new())),
            panicking_stations: Arc::new(Mutex::new(HashSet::new())),
            running: Arc::new(AtomicUsize::new(0)),
            max_running: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the simulated execution duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Make every job for `station_id` fail.
    pub fn fail_station(&self, station_id: u32) {
        lock(&self.failing_stations).insert(station_id);
    }

    /// Make every job for `station_id` panic mid-execution.
    pub fn panic_station(&self, station_id: u32) {
        lock(&self.panicking_stations).insert(station_id);
    }

    /// Jobs that started executing, in start order.
    pub fn executed(&self) -> Vec<Job> {
        lock(&self.executed).clone()
    }

    /// Ids of executed jobs, in start order.
    pub fn executed_ids(&self) -> Vec<JobId> {
        lock(&self.executed).iter().map(Job::id).collect()
    }

    /// Largest number of overlapping executions observed.
    pub fn max_concurrent(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobExecutor for MockExecutor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, job: &Job) -> Result<(), DispatchError> {
        lock(&self.executed).push(job.clone());

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);

        if !self.duration.is_zero() {
            tokio::time::sleep(self.duration).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        let station = job.station_id();
        if lock(&self.panicking_stations).contains(&station) {
            panic!("mock executor panic for station {}", station);
        }
        if lock(&self.failing_stations).contains(&station) {
            return Err(DispatchError::Execution(format!(
                "mock failure for station {}",
                station
            )));
        }
        Ok(())
    }

    fn estimated_duration(&self) -> Duration {
        self.duration
    }
}
