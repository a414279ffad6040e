//! The dispatcher: wires the queue, resources, stats and workers together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DispatcherConfig;
use crate::error::DispatchError;
use crate::job::{ItemKind, Job, JobId, PriorityClass};
use crate::queue::JobQueue;
use crate::resources::{ExclusiveStation, ResourcePermits};
use crate::stats::{StatsAggregator, StatsEvent, StatsSnapshot};
use crate::worker::{JobExecutor, WorkerContext, WorkerPool};

use super::types::{DispatcherStatus, ShutdownReport};

/// Accepts jobs from any number of clients and runs them on a fixed pool.
///
/// Must be started inside a tokio runtime. All methods take `&self`, so a
/// dispatcher is typically shared behind an `Arc`.
pub struct Dispatcher {
    config: DispatcherConfig,
    queue: Arc<JobQueue>,
    permits: Arc<ResourcePermits>,
    station: Arc<ExclusiveStation>,
    stats: Arc<StatsAggregator>,
    executor_name: String,
    pool: Mutex<Option<WorkerPool>>,
    running: AtomicBool,
    cancel: CancellationToken,
}

impl Dispatcher {
    /// Validates `config`, builds the shared state and spawns the workers.
    pub fn start(
        config: DispatcherConfig,
        executor: Arc<dyn JobExecutor>,
    ) -> Result<Self, DispatchError> {
        config.validate().map_err(DispatchError::Config)?;

        let queue = Arc::new(JobQueue::new());
        let permits = Arc::new(ResourcePermits::new(config.permit_capacity));
        let station = Arc::new(ExclusiveStation::new());
        let stats = Arc::new(
            StatsAggregator::new(config.tracking_capacity)
                .with_estimated_duration(executor.estimated_duration())
                .with_event_buffer(config.event_buffer),
        );
        let cancel = CancellationToken::new();
        let executor_name = executor.name().to_string();

        let pool = WorkerPool::spawn(
            config.workers,
            WorkerContext {
                queue: Arc::clone(&queue),
                permits: Arc::clone(&permits),
                station: Arc::clone(&station),
                stats: Arc::clone(&stats),
                executor,
                cancel: cancel.clone(),
            },
        );

        info!(
            workers = config.workers,
            permits = config.permit_capacity,
            stations = config.max_stations,
            executor = %executor_name,
            "Kitchen opened"
        );

        Ok(Self {
            config,
            queue,
            permits,
            station,
            stats,
            executor_name,
            pool: Mutex::new(Some(pool)),
            running: AtomicBool::new(true),
            cancel,
        })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    fn pool(&self) -> MutexGuard<'_, Option<WorkerPool>> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Intake
    // =========================================================================

    /// Enqueues a job and returns its id without waiting for execution.
    ///
    /// Fails with `InvalidInput` for a station outside `1..=max_stations`
    /// and with `Closed` once shutdown has begun.
    pub fn submit(
        &self,
        station_id: u32,
        item_kind: ItemKind,
        priority: PriorityClass,
    ) -> Result<JobId, DispatchError> {
        if station_id == 0 || station_id > self.config.max_stations {
            return Err(DispatchError::InvalidInput(format!(
                "station_id must be between 1 and {}, got {}",
                self.config.max_stations, station_id
            )));
        }
        if self.queue.is_closed() {
            return Err(DispatchError::Closed);
        }

        let job = Job::new(station_id, item_kind, priority);
        let job_id = job.id();

        // Recorded before enqueueing so a worker never sees an unknown job.
        if let Err(e) = self.stats.record_submit(&job) {
            warn!(job_id = %job_id, station_id, "Order not tracked: {}", e);
        }

        if let Err(e) = self.queue.submit(job) {
            // Lost a race with shutdown after the closed check.
            self.stats.record_dropped(1);
            return Err(e);
        }

        debug!(
            job_id = %job_id,
            station_id,
            item = %item_kind,
            priority = %priority,
            "Order submitted"
        );
        Ok(job_id)
    }

    /// Parses loosely-typed client input and submits it.
    ///
    /// `item_kind` accepts `burger`/`steak` or `1`/`2`; `priority` accepts
    /// `high`/`normal` or `vip`/`regular`.
    pub fn submit_raw(
        &self,
        station_id: i64,
        item_kind: &str,
        priority: &str,
    ) -> Result<JobId, DispatchError> {
        let station_id = u32::try_from(station_id).map_err(|_| {
            DispatchError::InvalidInput(format!("invalid station_id: {}", station_id))
        })?;
        let item_kind: ItemKind = item_kind.parse()?;
        let priority: PriorityClass = priority.parse()?;
        self.submit(station_id, item_kind, priority)
    }

    // =========================================================================
    // Observation
    // =========================================================================

    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn status(&self) -> DispatcherStatus {
        let in_flight = self.pool().as_ref().map(WorkerPool::in_flight).unwrap_or(0);
        DispatcherStatus {
            running: self.running.load(Ordering::SeqCst),
            workers: self.config.workers,
            in_flight,
            queue: self.queue.depths(),
            permits_in_use: self.permits.in_use(),
            permit_capacity: self.permits.capacity(),
            station: self.station.state(),
            executor: self.executor_name.clone(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatsEvent> {
        self.stats.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Stops intake and winds the pool down.
    ///
    /// Jobs still queued are dropped and counted. Jobs already held by a
    /// worker get up to `timeout` to finish; past that they are abandoned
    /// and `ShutdownTimeout` is returned; abandoned jobs are recorded as
    /// failed, so no job is left in progress. Only the first call does anything;
    /// later calls return `Closed`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<ShutdownReport, DispatchError> {
        let pool = self.pool().take().ok_or(DispatchError::Closed)?;
        self.running.store(false, Ordering::SeqCst);

        let finished_before = finished(&self.stats.snapshot());

        let dropped = self.queue.close_and_drain().len();
        self.stats.record_dropped(dropped as u64);
        if dropped > 0 {
            warn!(dropped, "Dropped undispatched orders");
        }

        info!(
            in_flight = pool.in_flight(),
            timeout_secs = timeout.as_secs_f64(),
            "Waiting for in-flight orders"
        );
        let joined = pool.join(timeout).await;
        let drained = finished(&self.stats.snapshot()).saturating_sub(finished_before) as usize;

        match joined {
            Ok(()) => {
                info!(dropped, drained, "Kitchen closed");
                Ok(ShutdownReport { dropped, drained })
            }
            Err(abandoned_ids) => {
                for job_id in &abandoned_ids {
                    self.stats.record_failure(*job_id, "abandoned at shutdown");
                }
                let abandoned = abandoned_ids.len();
                warn!(dropped, drained, abandoned, "Kitchen closed before in-flight orders finished");
                Err(DispatchError::ShutdownTimeout {
                    dropped,
                    drained,
                    abandoned,
                })
            }
        }
    }
}

fn finished(snapshot: &StatsSnapshot) -> u64 {
    snapshot.completed + snapshot.failed
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Workers would otherwise wait on the queue forever.
        if self.pool().is_some() {
            self.queue.close();
            self.cancel.cancel();
        }
    }
}
