//! Fixed pool of long-lived worker loops.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::DispatchError;
use crate::job::{Job, JobId, JobStage};
use crate::metrics::JOBS_IN_FLIGHT;
use crate::queue::JobQueue;
use crate::resources::{ExclusiveStation, ResourcePermits};
use crate::stats::StatsAggregator;

use super::executor::JobExecutor;

/// Everything a worker loop needs. Cheap to clone.
#[derive(Clone)]
pub struct WorkerContext {
    pub queue: Arc<JobQueue>,
    pub permits: Arc<ResourcePermits>,
    pub station: Arc<ExclusiveStation>,
    pub stats: Arc<StatsAggregator>,
    pub executor: Arc<dyn JobExecutor>,
    /// Fires only when shutdown gives up waiting; unblocks every suspension point.
    pub cancel: CancellationToken,
}

/// Ids of jobs dequeued but not yet recorded.
#[derive(Debug, Default)]
struct InFlightJobs {
    jobs: Mutex<HashSet<JobId>>,
}

impl InFlightJobs {
    fn lock(&self) -> MutexGuard<'_, HashSet<JobId>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    /// Empties the set, handing the outcome of every listed job to the caller.
    fn take_all(&self) -> Vec<JobId> {
        self.lock().drain().collect()
    }
}

/// Marks one job in flight for as long as its worker holds it.
struct InFlight {
    jobs: Arc<InFlightJobs>,
    job_id: JobId,
}

impl InFlight {
    fn enter(jobs: &Arc<InFlightJobs>, job_id: JobId) -> Self {
        jobs.lock().insert(job_id);
        JOBS_IN_FLIGHT.inc();
        Self {
            jobs: Arc::clone(jobs),
            job_id,
        }
    }

    /// Claims the right to record the job's outcome.
    ///
    /// Returns false once `join` has given up on the job; it is then
    /// already recorded as abandoned.
    fn finish(&self) -> bool {
        self.jobs.lock().remove(&self.job_id)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.jobs.lock().remove(&self.job_id);
        JOBS_IN_FLIGHT.dec();
    }
}

/// N worker tasks consuming the shared queue.
///
/// Workers exit once the queue is closed and empty. A failing job is logged
/// and counted; it never stops its worker.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    in_flight: Arc<InFlightJobs>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Spawns `size` workers, numbered from 1.
    pub fn spawn(size: usize, ctx: WorkerContext) -> Self {
        let in_flight = Arc::new(InFlightJobs::default());
        let cancel = ctx.cancel.clone();

        let handles = (1..=size)
            .map(|worker_id| {
                let ctx = ctx.clone();
                let in_flight = Arc::clone(&in_flight);
                tokio::spawn(async move { Self::run_worker(worker_id, ctx, in_flight).await })
            })
            .collect();

        Self {
            handles,
            in_flight,
            cancel,
        }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Jobs dequeued but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Waits for every worker to exit.
    ///
    /// The queue must already be closed. If `timeout` expires first the
    /// remaining workers are cancelled and aborted, and the ids of the jobs
    /// still in flight at that moment are returned as the error. Their
    /// workers will not record them; that is left to the caller.
    pub async fn join(self, timeout: Duration) -> Result<(), Vec<JobId>> {
        let WorkerPool {
            handles,
            in_flight,
            cancel,
        } = self;
        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

        match tokio::time::timeout(timeout, futures::future::join_all(handles)).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        error!("Worker task ended abnormally: {}", e);
                    }
                }
                Ok(())
            }
            Err(_) => {
                let abandoned = in_flight.take_all();
                cancel.cancel();
                for abort in aborts {
                    abort.abort();
                }
                Err(abandoned)
            }
        }
    }

    async fn run_worker(worker_id: usize, ctx: WorkerContext, in_flight: Arc<InFlightJobs>) {
        info!(worker = worker_id, "Worker ready");

        loop {
            let job = match ctx.queue.dequeue(&ctx.cancel).await {
                Ok(Some(job)) => job,
                Ok(None) => break,
                Err(e) => {
                    debug!(worker = worker_id, "Dequeue interrupted: {}", e);
                    break;
                }
            };

            let job_id = job.id();
            let guard = InFlight::enter(&in_flight, job_id);

            let outcome = AssertUnwindSafe(Self::process(worker_id, &ctx, &job))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(DispatchError::Execution("job body panicked".to_string())));

            if !guard.finish() {
                debug!(worker = worker_id, job_id = %job_id, "Job already abandoned by shutdown");
                continue;
            }

            match outcome {
                Ok(elapsed) => {
                    ctx.stats.record_completion(job_id, elapsed);
                    info!(
                        worker = worker_id,
                        job_id = %job_id,
                        station_id = job.station_id(),
                        item = %job.item_kind(),
                        duration_ms = elapsed.as_millis() as u64,
                        "Order completed"
                    );
                }
                Err(e) if e.is_shutdown() => {
                    debug!(worker = worker_id, job_id = %job_id, "Job interrupted by shutdown");
                    ctx.stats.record_failure(job_id, &e.to_string());
                }
                Err(e) => {
                    warn!(worker = worker_id, job_id = %job_id, "Job failed: {}", e);
                    ctx.stats.record_failure(job_id, &e.to_string());
                }
            }
        }

        info!(worker = worker_id, "Worker stopped");
    }

    /// Runs one job: permit, then station, then the body.
    async fn process(
        worker_id: usize,
        ctx: &WorkerContext,
        job: &Job,
    ) -> Result<Duration, DispatchError> {
        ctx.stats.record_stage_change(job.id(), JobStage::Executing);
        info!(
            worker = worker_id,
            job_id = %job.id(),
            station_id = job.station_id(),
            item = %job.item_kind(),
            priority = %job.priority(),
            "Order received"
        );

        let permit = ctx.permits.acquire(&ctx.cancel).await?;
        let station = ctx.station.acquire(job.id(), &ctx.cancel).await?;
        debug!(worker = worker_id, station_id = job.station_id(), "Station locked");

        let started = Instant::now();
        let result = ctx.executor.execute(job).await;
        let elapsed = started.elapsed();

        station.release();
        debug!(worker = worker_id, station_id = job.station_id(), "Station free");
        permit.release();

        result?;
        Ok(elapsed)
    }
}
