pub mod config;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod metrics;
pub mod queue;
pub mod resources;
pub mod stats;
pub mod testing;
pub mod worker;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DispatcherConfig,
    ServerConfig,
};
pub use dispatcher::{Dispatcher, DispatcherStatus, ShutdownReport};
pub use error::DispatchError;
pub use job::{ItemKind, Job, JobId, JobStage, PriorityClass};
pub use queue::{JobQueue, QueueDepths};
pub use resources::{ExclusiveStation, IngredientPermit, ResourcePermits, StationGuard, StationState};
pub use stats::{PerJobRecord, StatsAggregator, StatsEvent, StatsSnapshot};
pub use worker::{JobExecutor, SimulatedExecutor, WorkerContext, WorkerPool};
