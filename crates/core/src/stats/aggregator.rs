//! Lock-serialized statistics aggregator.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::DispatchError;
use crate::job::{Job, JobId, JobStage, PriorityClass};
use crate::metrics::{EXECUTION_DURATION, JOBS_COMPLETED, JOBS_DROPPED, JOBS_FAILED, JOBS_SUBMITTED};

use super::types::{PerJobRecord, StatsEvent, StatsSnapshot};

/// Default number of individually tracked jobs.
pub const DEFAULT_TRACKING_CAPACITY: usize = 100;

const DEFAULT_EVENT_BUFFER: usize = 256;

#[derive(Debug)]
struct StatsState {
    snapshot: StatsSnapshot,
    index: HashMap<JobId, usize>,
}

/// Accumulates counters and per-job records from every producer and worker.
///
/// All mutation goes through a single lock; readers only ever get a cloned
/// [`StatsSnapshot`]. Each update is followed by a [`StatsEvent`] on the
/// broadcast channel returned by [`StatsAggregator::subscribe`].
#[derive(Debug)]
pub struct StatsAggregator {
    state: Mutex<StatsState>,
    capacity: usize,
    estimated_duration: Duration,
    events: broadcast::Sender<StatsEvent>,
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_TRACKING_CAPACITY)
    }
}

impl StatsAggregator {
    /// Creates an empty aggregator tracking at most `capacity` jobs individually.
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_BUFFER);
        Self {
            state: Mutex::new(StatsState {
                snapshot: StatsSnapshot::default(),
                index: HashMap::new(),
            }),
            capacity,
            estimated_duration: Duration::ZERO,
            events,
        }
    }

    /// Sets the duration stamped on new records as their estimate.
    pub fn with_estimated_duration(mut self, estimated: Duration) -> Self {
        self.estimated_duration = estimated;
        self
    }

    /// Sets the change-event channel capacity.
    pub fn with_event_buffer(mut self, buffer: usize) -> Self {
        let (events, _) = broadcast::channel(buffer.max(1));
        self.events = events;
        self
    }

    fn lock(&self) -> MutexGuard<'_, StatsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: StatsEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn tracking_capacity(&self) -> usize {
        self.capacity
    }

    /// Counts a newly accepted job and opens its tracking record.
    ///
    /// The counters are always updated. When the record table is full the
    /// job goes untracked and `CapacityExceeded` is returned; callers should
    /// log it and carry on.
    pub fn record_submit(&self, job: &Job) -> Result<(), DispatchError> {
        let tracked = {
            let mut state = self.lock();
            let stats = &mut state.snapshot;
            stats.received += 1;
            match job.priority() {
                PriorityClass::High => stats.high_priority_count += 1,
                PriorityClass::Normal => stats.normal_count += 1,
            }

            if stats.records.len() < self.capacity {
                stats.records.push(PerJobRecord {
                    job_id: job.id(),
                    station_id: job.station_id(),
                    item_kind: job.item_kind(),
                    priority: job.priority(),
                    submitted_at: job.submitted_at(),
                    started_at: None,
                    completed_at: None,
                    completed: false,
                    stage: JobStage::Queued,
                    estimated_duration_ms: self.estimated_duration.as_millis() as u64,
                    duration_ms: None,
                });
                let position = stats.records.len() - 1;
                state.index.insert(job.id(), position);
                true
            } else {
                stats.untracked += 1;
                false
            }
        };

        JOBS_SUBMITTED
            .with_label_values(&[job.priority().as_str()])
            .inc();
        self.emit(StatsEvent::Submitted {
            job_id: job.id(),
            priority: job.priority(),
            tracked,
        });

        if tracked {
            Ok(())
        } else {
            Err(DispatchError::CapacityExceeded {
                capacity: self.capacity,
            })
        }
    }

    /// Moves a tracked job to `stage`. Untracked jobs are ignored.
    pub fn record_stage_change(&self, job_id: JobId, stage: JobStage) {
        let found = {
            let mut state = self.lock();
            match state.index.get(&job_id).copied() {
                Some(position) => {
                    let record = &mut state.snapshot.records[position];
                    record.stage = stage;
                    if stage == JobStage::Executing && record.started_at.is_none() {
                        record.started_at = Some(Utc::now());
                    }
                    true
                }
                None => false,
            }
        };

        if found {
            self.emit(StatsEvent::StageChanged { job_id, stage });
        } else {
            debug!(job_id = %job_id, stage = stage.as_str(), "Stage change for untracked job");
        }
    }

    /// Records a successful completion and its measured duration.
    pub fn record_completion(&self, job_id: JobId, duration: Duration) {
        let duration_ms = duration.as_millis() as u64;
        {
            let mut state = self.lock();
            let position = state.index.get(&job_id).copied();
            let stats = &mut state.snapshot;

            stats.completed += 1;
            stats.total_completion_ms += duration_ms;
            if stats.completed == 1 {
                stats.min_duration_ms = Some(duration_ms);
                stats.max_duration_ms = Some(duration_ms);
            } else {
                stats.min_duration_ms = stats.min_duration_ms.map(|m| m.min(duration_ms));
                stats.max_duration_ms = stats.max_duration_ms.map(|m| m.max(duration_ms));
            }

            if let Some(position) = position {
                let record = &mut stats.records[position];
                record.stage = JobStage::Done;
                record.completed = true;
                record.completed_at = Some(Utc::now());
                record.duration_ms = Some(duration_ms);
            }
        }

        JOBS_COMPLETED.inc();
        EXECUTION_DURATION.observe(duration.as_secs_f64());
        self.emit(StatsEvent::Completed {
            job_id,
            duration_ms,
        });
    }

    /// Records a job whose execution failed. Its record ends `Done` but not completed.
    pub fn record_failure(&self, job_id: JobId, error: &str) {
        {
            let mut state = self.lock();
            let position = state.index.get(&job_id).copied();
            let stats = &mut state.snapshot;
            stats.failed += 1;
            if let Some(position) = position {
                let record = &mut stats.records[position];
                record.stage = JobStage::Done;
                record.completed = false;
                record.completed_at = Some(Utc::now());
            }
        }

        JOBS_FAILED.inc();
        self.emit(StatsEvent::Failed {
            job_id,
            error: error.to_string(),
        });
    }

    /// Counts jobs discarded without being dispatched.
    pub fn record_dropped(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.lock().snapshot.dropped += count;
        JOBS_DROPPED.inc_by(count);
        self.emit(StatsEvent::Dropped { count });
    }

    /// Returns a consistent copy of the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        self.lock().snapshot.clone()
    }

    /// Subscribes to change events.
    pub fn subscribe(&self) -> broadcast::Receiver<StatsEvent> {
        self.events.subscribe()
    }
}
