//! Order intake API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use kitchen_core::{DispatchError, JobId, PerJobRecord};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting an order
#[derive(Debug, Deserialize)]
pub struct SubmitOrderBody {
    /// Station (table) the order is for, starting at 1
    pub station_id: i64,
    /// `burger` / `steak`, or the numeric ids `1` / `2`
    pub item_kind: String,
    /// `high` / `normal`; `vip` / `regular` also accepted
    pub priority: String,
}

/// Response for an accepted order
#[derive(Debug, Serialize)]
pub struct SubmitOrderResponse {
    pub job_id: JobId,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct OrderErrorResponse {
    pub error: String,
}

/// Maps engine errors onto HTTP statuses.
pub struct ApiError(DispatchError);

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DispatchError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DispatchError::Closed | DispatchError::Canceled => StatusCode::SERVICE_UNAVAILABLE,
            other => {
                error!("Unexpected dispatch error: {}", other);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            Json(OrderErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit an order. Returns as soon as it is queued.
pub async fn submit_order(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitOrderBody>,
) -> Result<(StatusCode, Json<SubmitOrderResponse>), ApiError> {
    let job_id =
        state
            .dispatcher()
            .submit_raw(body.station_id, &body.item_kind, &body.priority)?;

    debug!(job_id = %job_id, station_id = body.station_id, "Order accepted");
    Ok((StatusCode::ACCEPTED, Json(SubmitOrderResponse { job_id })))
}

/// Get the tracking record of one order.
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PerJobRecord>, Response> {
    let job_id: JobId = id
        .parse()
        .map_err(|e: DispatchError| ApiError(e).into_response())?;

    let snapshot = state.dispatcher().snapshot();
    match snapshot.record(job_id) {
        Some(record) => Ok(Json(record.clone())),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(OrderErrorResponse {
                error: format!("order not tracked: {}", job_id),
            }),
        )
            .into_response()),
    }
}
