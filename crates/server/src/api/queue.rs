//! Waiting-room API handlers.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use waitroom_core::queue::{JoinStatus, QueueCounters, RateSource, StatusOutcome};

use super::error::ApiError;
use super::identity::{identity_set_cookie, mint_identity, resolve_identity, IdentityParams};
use crate::metrics::IDENTITIES_MINTED;
use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

/// Response for a join
#[derive(Debug, Serialize)]
pub struct JoinResponse {
    /// Identity the ticket belongs to (echoed, or freshly minted)
    pub user_id: String,
    /// `waiting`, or `admitted` for a client promoted earlier
    #[serde(flatten)]
    pub joined: JoinStatus,
}

/// Response for queue-wide stats
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub event_id: String,
    #[serde(flatten)]
    pub counters: QueueCounters,
    pub admit_rate: u64,
    pub rate_source: RateSource,
}

// ============================================================================
// Handlers
// ============================================================================

/// Enter the waiting room (idempotent per identity)
pub async fn join(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IdentityParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let (identity, minted) = match resolve_identity(&params, &headers) {
        Some(identity) => (identity, false),
        None => (mint_identity(), true),
    };

    let joined = state.queue().join(&identity).await?;

    let mut response = Json(JoinResponse {
        user_id: identity.trim().to_string(),
        joined,
    })
    .into_response();

    if minted {
        IDENTITIES_MINTED.inc();
        debug!(user_id = %identity, "Minted identity for anonymous client");
        let cookie = identity_set_cookie(&identity).map_err(|e| ApiError::Internal(e.to_string()))?;
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }

    Ok(response)
}

/// Current standing of a client
pub async fn status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IdentityParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let identity = resolve_identity(&params, &headers)
        .ok_or_else(|| ApiError::BadRequest("missing user_id".to_string()))?;

    let outcome = state.queue().status(&identity).await?;
    let code = match outcome {
        StatusOutcome::NotInQueue => StatusCode::NOT_FOUND,
        _ => StatusCode::OK,
    };
    Ok((code, Json(outcome)).into_response())
}

/// Queue-wide counters and the rate in effect
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    let (counters, rate) = tokio::join!(state.queue().counters(), state.queue().rate_snapshot());
    Ok(Json(StatsResponse {
        event_id: state.event_id().to_string(),
        counters: counters?,
        admit_rate: rate.rate,
        rate_source: rate.source,
    }))
}
