//! Prometheus metrics for the dispatch engine.
//!
//! This module provides metrics for:
//! - Job flow (submitted, completed, failed, dropped)
//! - Execution timing
//! - Resource usage (ingredient permits, the station)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Job Flow Metrics
// =============================================================================

/// Jobs accepted by submit, by priority class.
pub static JOBS_SUBMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("kitchen_jobs_submitted_total", "Total jobs submitted"),
        &["priority"], // "high", "normal"
    )
    .unwrap()
});

/// Jobs completed successfully.
pub static JOBS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("kitchen_jobs_completed_total", "Total jobs completed").unwrap()
});

/// Jobs whose execution failed.
pub static JOBS_FAILED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("kitchen_jobs_failed_total", "Total jobs that failed").unwrap()
});

/// Jobs dropped undispatched at shutdown.
pub static JOBS_DROPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "kitchen_jobs_dropped_total",
        "Total queued jobs dropped at shutdown",
    )
    .unwrap()
});

/// Time spent executing a job at the station.
pub static EXECUTION_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "kitchen_execution_duration_seconds",
            "Duration of job execution at the station",
        )
        .buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 25.0, 30.0, 60.0]),
    )
    .unwrap()
});

// =============================================================================
// Resource Metrics
// =============================================================================

/// Ingredient permits currently held.
pub static PERMITS_IN_USE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "kitchen_permits_in_use",
        "Number of ingredient permits currently held",
    )
    .unwrap()
});

/// Station occupancy (1 = busy, 0 = free).
pub static STATION_BUSY: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "kitchen_station_busy",
        "Whether the exclusive station is occupied (1) or free (0)",
    )
    .unwrap()
});

/// Jobs between dequeue and completion.
pub static JOBS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "kitchen_jobs_in_flight",
        "Number of jobs currently held by workers",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Job flow
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOBS_COMPLETED.clone()),
        Box::new(JOBS_FAILED.clone()),
        Box::new(JOBS_DROPPED.clone()),
        Box::new(EXECUTION_DURATION.clone()),
        // Resources
        Box::new(PERMITS_IN_USE.clone()),
        Box::new(STATION_BUSY.clone()),
        Box::new(JOBS_IN_FLIGHT.clone()),
    ]
}
