//! Types reported by the dispatcher.

use serde::{Deserialize, Serialize};

use crate::queue::QueueDepths;
use crate::resources::StationState;

/// Point-in-time view of the engine's moving parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatcherStatus {
    /// False once shutdown has begun.
    pub running: bool,
    /// Worker loops started.
    pub workers: usize,
    /// Jobs dequeued and not yet finished.
    pub in_flight: usize,
    /// Jobs waiting per priority class.
    pub queue: QueueDepths,
    pub permits_in_use: usize,
    pub permit_capacity: usize,
    pub station: StationState,
    /// Name of the job executor.
    pub executor: String,
}

/// Outcome of a shutdown that finished within its timeout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownReport {
    /// Queued jobs discarded without being dispatched.
    pub dropped: usize,
    /// In-flight jobs that finished while shutdown waited.
    pub drained: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        let status = DispatcherStatus {
            running: true,
            workers: 3,
            in_flight: 1,
            queue: QueueDepths { high: 2, normal: 0 },
            permits_in_use: 1,
            permit_capacity: 8,
            station: StationState::Free,
            executor: "simulated".to_string(),
        };

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["queue"]["high"], 2);
        assert_eq!(json["station"]["state"], "free");
        assert_eq!(json["executor"], "simulated");

        let parsed: DispatcherStatus = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, status);
    }
}
