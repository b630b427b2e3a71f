//! Liability API endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use robomarket_core::{topics, Address, Liability, LiabilityRecord};
use serde::Serialize;

use crate::state::AppState;

/// Active and recently terminated liabilities.
#[derive(Debug, Serialize)]
pub struct LiabilityListResponse {
    pub active: Vec<LiabilityRecord>,
    pub history: Vec<LiabilityRecord>,
}

/// Publish a liability-ready notification.
pub async fn submit_liability(
    State(state): State<AppState>,
    Json(liability): Json<Liability>,
) -> Result<StatusCode, (StatusCode, String)> {
    liability
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let message = serde_json::to_value(&liability)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    state
        .transport
        .publish(topics::LIABILITY_READY, message)
        .await
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;

    Ok(StatusCode::ACCEPTED)
}

/// List liabilities.
pub async fn list_liabilities(State(state): State<AppState>) -> Json<LiabilityListResponse> {
    Json(LiabilityListResponse {
        active: state.coordinator.active().await,
        history: state.coordinator.history().await,
    })
}

/// Get one liability by address.
pub async fn get_liability(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<LiabilityRecord>, StatusCode> {
    state
        .coordinator
        .record(&Address::new(address))
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
