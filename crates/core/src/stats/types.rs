//! Statistics data types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::{ItemKind, JobId, JobStage, PriorityClass};

/// Tracking record for one submitted job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerJobRecord {
    pub job_id: JobId,
    pub station_id: u32,
    pub item_kind: ItemKind,
    pub priority: PriorityClass,
    pub submitted_at: DateTime<Utc>,
    /// When a worker picked the job up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// True only for jobs that finished successfully.
    pub completed: bool,
    pub stage: JobStage,
    pub estimated_duration_ms: u64,
    /// Measured execution time, once done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Consistent point-in-time copy of the aggregate statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Jobs accepted by submit.
    pub received: u64,
    pub completed: u64,
    /// Jobs whose execution failed.
    pub failed: u64,
    /// Jobs discarded undispatched at shutdown.
    pub dropped: u64,
    pub high_priority_count: u64,
    pub normal_count: u64,
    pub total_completion_ms: u64,
    /// Only set once at least one job has completed.
    pub min_duration_ms: Option<u64>,
    pub max_duration_ms: Option<u64>,
    /// Per-job records, in submission order, up to the tracking capacity.
    pub records: Vec<PerJobRecord>,
    /// Jobs processed without a record because the table was full.
    pub untracked: u64,
}

impl StatsSnapshot {
    /// Jobs received but not yet finished one way or another.
    pub fn pending(&self) -> u64 {
        self.received
            .saturating_sub(self.completed + self.failed + self.dropped)
    }

    /// Mean completion time, `None` until something has completed.
    pub fn average_duration(&self) -> Option<Duration> {
        if self.completed == 0 {
            return None;
        }
        Some(Duration::from_millis(self.total_completion_ms / self.completed))
    }

    /// Percentage of received jobs that completed.
    pub fn completion_rate(&self) -> Option<f64> {
        if self.received == 0 {
            return None;
        }
        Some(self.completed as f64 / self.received as f64 * 100.0)
    }

    pub fn min_duration(&self) -> Option<Duration> {
        self.min_duration_ms.map(Duration::from_millis)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_ms.map(Duration::from_millis)
    }

    pub fn total_completion(&self) -> Duration {
        Duration::from_millis(self.total_completion_ms)
    }

    pub fn record(&self, job_id: JobId) -> Option<&PerJobRecord> {
        self.records.iter().find(|r| r.job_id == job_id)
    }

    /// Records of one priority class, in submission order.
    pub fn records_for(&self, priority: PriorityClass) -> impl Iterator<Item = &PerJobRecord> {
        self.records.iter().filter(move |r| r.priority == priority)
    }
}

/// Change notification emitted after every aggregator update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatsEvent {
    Submitted {
        job_id: JobId,
        priority: PriorityClass,
        /// False when the tracking table was already full.
        tracked: bool,
    },
    StageChanged {
        job_id: JobId,
        stage: JobStage,
    },
    Completed {
        job_id: JobId,
        duration_ms: u64,
    },
    Failed {
        job_id: JobId,
        error: String,
    },
    Dropped {
        count: u64,
    },
}
