//! Aggregate statistics shared by submitters and workers.

mod aggregator;
mod types;

pub use aggregator::{StatsAggregator, DEFAULT_TRACKING_CAPACITY};
pub use types::{PerJobRecord, StatsEvent, StatsSnapshot};
