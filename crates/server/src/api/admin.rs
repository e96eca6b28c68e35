//! Operator API handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use waitroom_core::WorkerStatus;

use super::error::ApiError;
use crate::state::AppState;

/// Query parameters for manual admission
#[derive(Debug, Deserialize)]
pub struct AdmitParams {
    /// Number of clients to admit (default 1). Non-positive admits nobody.
    pub count: Option<String>,
}

/// Request body for changing the admission rate
#[derive(Debug, Deserialize)]
pub struct SetRateBody {
    pub rate: u64,
}

/// Response for manual admission
#[derive(Debug, Serialize)]
pub struct AdmitResponse {
    pub ok: bool,
    pub admitted: u64,
    pub now_serving: u64,
}

/// Response for a rate change
#[derive(Debug, Serialize)]
pub struct SetRateResponse {
    pub ok: bool,
    pub rate: u64,
}

/// Admit up to `count` of the longest-waiting clients now
pub async fn admit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AdmitParams>,
) -> Result<Json<AdmitResponse>, ApiError> {
    let count = parse_count(params.count.as_deref())?;
    let report = state.worker().admit_now(count).await?;
    Ok(Json(AdmitResponse {
        ok: true,
        admitted: report.promoted_count,
        now_serving: report.now_serving,
    }))
}

/// Change the runtime admission rate
pub async fn set_rate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetRateBody>,
) -> Result<Json<SetRateResponse>, ApiError> {
    state.queue().set_admit_rate(body.rate).await?;
    info!(rate = body.rate, "Admission rate changed");
    Ok(Json(SetRateResponse {
        ok: true,
        rate: body.rate,
    }))
}

/// Admission worker status
pub async fn worker_status(State(state): State<Arc<AppState>>) -> Json<WorkerStatus> {
    Json(state.worker().status().await)
}

fn parse_count(raw: Option<&str>) -> Result<u64, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(1);
    };
    let count: i64 = raw
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid count: {}", raw)))?;
    Ok(u64::try_from(count).unwrap_or(0))
}
