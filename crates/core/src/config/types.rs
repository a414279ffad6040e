use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Sizing and timing of the dispatch engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DispatcherConfig {
    /// Number of worker loops (default: 3)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Ingredient permits available at once (default: 8)
    #[serde(default = "default_permit_capacity")]
    pub permit_capacity: usize,

    /// Highest accepted station id; ids start at 1 (default: 15)
    #[serde(default = "default_max_stations")]
    pub max_stations: u32,

    /// Per-job records kept before jobs go untracked (default: 100)
    #[serde(default = "default_tracking_capacity")]
    pub tracking_capacity: usize,

    /// Time units one simulated execution takes (default: 25)
    #[serde(default = "default_execution_units")]
    pub execution_units: u32,

    /// Length of one time unit in milliseconds (default: 1000)
    #[serde(default = "default_time_unit_ms")]
    pub time_unit_ms: u64,

    /// How long shutdown waits for in-flight jobs (default: 30)
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Capacity of the stats event channel (default: 256)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_workers() -> usize {
    3
}

fn default_permit_capacity() -> usize {
    8
}

fn default_max_stations() -> u32 {
    15
}

fn default_tracking_capacity() -> usize {
    100
}

fn default_execution_units() -> u32 {
    25
}

fn default_time_unit_ms() -> u64 {
    1000
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn default_event_buffer() -> usize {
    256
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            permit_capacity: default_permit_capacity(),
            max_stations: default_max_stations(),
            tracking_capacity: default_tracking_capacity(),
            execution_units: default_execution_units(),
            time_unit_ms: default_time_unit_ms(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl DispatcherConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_permit_capacity(mut self, capacity: usize) -> Self {
        self.permit_capacity = capacity;
        self
    }

    pub fn with_max_stations(mut self, max_stations: u32) -> Self {
        self.max_stations = max_stations;
        self
    }

    pub fn with_tracking_capacity(mut self, capacity: usize) -> Self {
        self.tracking_capacity = capacity;
        self
    }

    pub fn with_execution_units(mut self, units: u32) -> Self {
        self.execution_units = units;
        self
    }

    pub fn with_time_unit_ms(mut self, ms: u64) -> Self {
        self.time_unit_ms = ms;
        self
    }

    pub fn with_shutdown_timeout_secs(mut self, secs: u64) -> Self {
        self.shutdown_timeout_secs = secs;
        self
    }

    pub fn with_event_buffer(mut self, size: usize) -> Self {
        self.event_buffer = size;
        self
    }

    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }

    /// Duration of one simulated execution. Saturates at `Duration::MAX`.
    pub fn execution_duration(&self) -> Duration {
        self.time_unit()
            .checked_mul(self.execution_units)
            .unwrap_or(Duration::MAX)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Checks the sizes the engine cannot run without.
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("dispatcher.workers must be at least 1".to_string());
        }
        if self.permit_capacity == 0 {
            return Err("dispatcher.permit_capacity must be at least 1".to_string());
        }
        if self.permit_capacity > Semaphore::MAX_PERMITS {
            return Err(format!(
                "dispatcher.permit_capacity cannot exceed {}",
                Semaphore::MAX_PERMITS
            ));
        }
        if self.max_stations == 0 {
            return Err("dispatcher.max_stations must be at least 1".to_string());
        }
        if self.time_unit_ms == 0 {
            return Err("dispatcher.time_unit_ms cannot be 0".to_string());
        }
        if self.time_unit().checked_mul(self.execution_units).is_none() {
            return Err(
                "dispatcher.execution_units * time_unit_ms overflows a duration".to_string(),
            );
        }
        if self.event_buffer == 0 {
            return Err("dispatcher.event_buffer must be at least 1".to_string());
        }
        Ok(())
    }
}
