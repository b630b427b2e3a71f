//! Market API endpoints.

use axum::{extract::State, http::StatusCode, Json};
use robomarket_core::{AgentState, Bid};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

/// Response after injecting a bid.
#[derive(Debug, Serialize)]
pub struct SubmitBidResponse {
    pub id: Uuid,
    pub topic: String,
}

/// Request to post a local demand.
#[derive(Debug, Deserialize)]
pub struct PostDemandRequest {
    /// Objective content, stored before the demand is published.
    pub objective: String,
    pub cost: i64,
}

/// Current negotiation state.
pub async fn get_agent(State(state): State<AppState>) -> Json<AgentState> {
    Json(state.negotiator.state())
}

/// Inject an inbound bid onto its topic.
pub async fn submit_bid(
    State(state): State<AppState>,
    Json(bid): Json<Bid>,
) -> Result<(StatusCode, Json<SubmitBidResponse>), (StatusCode, String)> {
    bid.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let topic = bid.kind.topic();
    let message = serde_json::to_value(&bid)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    state
        .transport
        .publish(topic, message)
        .await
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitBidResponse {
            id: bid.id,
            topic: topic.to_string(),
        }),
    ))
}

/// Store an objective and publish a demand for it.
pub async fn post_demand(
    State(state): State<AppState>,
    Json(req): Json<PostDemandRequest>,
) -> Result<(StatusCode, Json<Bid>), (StatusCode, String)> {
    if req.objective.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "objective must not be empty".to_string()));
    }

    match state
        .negotiator
        .post_demand(req.objective.into_bytes(), req.cost)
        .await
    {
        Ok(bid) => Ok((StatusCode::CREATED, Json(bid))),
        Err(err) => {
            warn!(error = %err, "Demand not published");
            Err((StatusCode::BAD_GATEWAY, err.to_string()))
        }
    }
}
