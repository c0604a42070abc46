use axum::extract::State;
use axum::response::IntoResponse;
use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::json;

use crate::state::ApiState;

pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

#[derive(Serialize)]
struct PeerCounts {
    connected: usize,
    known: usize,
    peer_id: String,
}

pub async fn status(State(state): State<ApiState>) -> impl IntoResponse {
    let mining = state.mining.status().await;
    let wallet_address = state.wallet.read().expect("wallet lock poisoned").address();
    let header_sync = state.header_sync.progress().snapshot();
    let peers = PeerCounts {
        connected: state.gossip.connected_peer_count().await,
        known: state.gossip.known_peer_count().await,
        peer_id: state.gossip.local_peer_id().to_string(),
    };

    Json(json!({
        "node_id": state.node_id,
        "uptime_ms": state.uptime_ms(),
        "peers": peers,
        "mining": mining,
        "wallet": { "address": wallet_address },
        "header_sync": header_sync,
    }))
}
