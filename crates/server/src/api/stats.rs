//! Statistics and status API handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use kitchen_core::{DispatcherStatus, PriorityClass, StatsSnapshot};

use super::orders::ApiError;
use crate::state::AppState;

/// Query parameters for the stats endpoint
#[derive(Debug, Deserialize)]
pub struct StatsParams {
    /// Only return records of this priority class
    pub priority: Option<String>,
}

/// Snapshot plus the values the live view derives from it.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub snapshot: StatsSnapshot,
    pub pending: u64,
    pub average_duration_ms: Option<u64>,
    /// Completed as a percentage of received
    pub completion_rate: Option<f64>,
}

impl From<StatsSnapshot> for StatsResponse {
    fn from(snapshot: StatsSnapshot) -> Self {
        Self {
            pending: snapshot.pending(),
            average_duration_ms: snapshot.average_duration().map(|d| d.as_millis() as u64),
            completion_rate: snapshot.completion_rate(),
            snapshot,
        }
    }
}

/// Current statistics, optionally narrowed to one priority class.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsParams>,
) -> Result<Json<StatsResponse>, ApiError> {
    let mut snapshot = state.dispatcher().snapshot();

    if let Some(priority) = params.priority {
        let priority: PriorityClass = priority.parse()?;
        snapshot.records = snapshot.records_for(priority).cloned().collect();
    }

    Ok(Json(StatsResponse::from(snapshot)))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<DispatcherStatus> {
    Json(state.dispatcher().status())
}
