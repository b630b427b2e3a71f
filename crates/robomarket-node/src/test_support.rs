//! Helpers for route tests.

use axum_test::TestServer;
use robomarket_core::AgentConfig;

use crate::agent::Agent;
use crate::state::AppState;

/// Standalone agent behind a test server, starting at asking cost 10.
pub async fn test_server() -> (TestServer, AppState) {
    let config = AgentConfig {
        arrangement_price_start: 10,
        ..AgentConfig::default()
    };
    let agent = Agent::start(config).await.expect("agent starts");
    let state = agent.state.clone();
    let server = TestServer::new(crate::create_router(state.clone())).expect("test server");
    (server, state)
}

#[tokio::test]
async fn test_health() {
    let (server, _state) = test_server().await;

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"], "default");
}
