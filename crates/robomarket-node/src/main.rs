//! # Robomarket Node
//!
//! Agent node binary: negotiates on the market, executes liabilities and
//! exposes an HTTP surface for ingress and observation.

use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

mod agent;
mod api;
mod settings;
mod state;
#[cfg(test)]
mod test_support;

use agent::Agent;
use state::AppState;

/// Run the agent node until Ctrl-C.
pub async fn run_node() -> anyhow::Result<()> {
    settings::init_tracing();

    let path = settings::config_path();
    let config = settings::load_config(&path)?;
    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen_addr {}", config.listen_addr))?;

    info!("Robomarket node starting...");

    let agent = Agent::start(config).await?;
    let app = create_router(agent.state.clone());

    info!("Listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    agent.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Create the API router.
fn create_router(state: AppState) -> Router {
    // CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))

        // Market API
        .route("/api/v1/agent", get(api::market::get_agent))
        .route("/api/v1/bids", post(api::market::submit_bid))
        .route("/api/v1/demand", post(api::market::post_demand))

        // Liability API
        .route(
            "/api/v1/liabilities",
            post(api::liability::submit_liability).get(api::liability::list_liabilities),
        )
        .route("/api/v1/liabilities/:address", get(api::liability::get_liability))

        // WebSocket endpoints
        .route("/ws/results", get(api::ws::result_stream))
        .route("/ws/negotiation", get(api::ws::negotiation_stream))

        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run_node().await
}
