//! WebSocket endpoints.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use robomarket_core::topics;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::state::AppState;

/// Stream of worker result payloads.
pub async fn result_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_result_stream(socket, state))
}

async fn handle_result_stream(socket: WebSocket, state: AppState) {
    let mut subscription = match state.transport.subscribe(topics::RESULT).await {
        Ok(subscription) => subscription,
        Err(err) => {
            warn!(error = %err, "Result subscription failed");
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();
    loop {
        tokio::select! {
            result = subscription.recv() => {
                let Some(payload) = result else { break };
                if sender.send(Message::Text(payload.to_string())).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
    debug!("Result stream closed");
}

/// Stream of negotiation events.
pub async fn negotiation_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_negotiation_stream(socket, state))
}

async fn handle_negotiation_stream(socket: WebSocket, state: AppState) {
    let mut events = state.negotiator.events();
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Negotiation stream lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        warn!(error = %err, "Unserializable negotiation event");
                        continue;
                    }
                };
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
    debug!("Negotiation stream closed");
}
