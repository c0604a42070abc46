//! SSE event stream: status snapshot every 5s, per-event push on
//! block-mined / mint-claimed / peer-block-accepted, 30s proxy heartbeat,
//! initial snapshot on subscribe.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::IntoResponse;
use clawminer_mining::Event as MiningEvent;
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::state::ApiState;

const STATUS_TICK_INTERVAL: Duration = Duration::from_secs(5);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const CHANNEL_CAPACITY: usize = 64;

pub async fn events(State(state): State<ApiState>) -> impl IntoResponse {
    let (tx, rx) = tokio::sync::mpsc::channel::<std::result::Result<SseEvent, Infallible>>(CHANNEL_CAPACITY);
    let mut events_rx = state.events.subscribe();

    let initial = json!({
        "type": "status",
        "timestamp": clawminer_core::now_ms(),
        "data": state.mining.status().await,
    });
    if tx.send(Ok(SseEvent::default().data(initial.to_string()))).await.is_err() {
        debug!("sse client disconnected before first send");
    }

    tokio::task::spawn(async move {
        let mut ticker = tokio::time::interval(STATUS_TICK_INTERVAL);
        ticker.tick().await; // consume the immediate first tick; we already sent one above.
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let envelope = json!({
                        "type": "status",
                        "timestamp": clawminer_core::now_ms(),
                        "data": state.mining.status().await,
                    });
                    if tx.send(Ok(SseEvent::default().data(envelope.to_string()))).await.is_err() {
                        return;
                    }
                }
                recv = events_rx.recv() => {
                    let event = match recv {
                        Ok(event) => event,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                    };
                    if let Some(envelope) = render_event(event) {
                        if tx.send(Ok(SseEvent::default().data(envelope.to_string()))).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::new().interval(HEARTBEAT_INTERVAL))
}

fn render_event(event: MiningEvent) -> Option<serde_json::Value> {
    let timestamp = clawminer_core::now_ms();
    let (type_name, data) = match event {
        MiningEvent::BlockMined { block_hash, height, item_count } => (
            "block_mined",
            json!({ "block_hash": hex::encode(block_hash), "height": height, "item_count": item_count }),
        ),
        MiningEvent::MintClaimed { txid, amount, block_hash } => (
            "mint_claimed",
            json!({ "txid": txid, "amount": amount, "block_hash": hex::encode(block_hash) }),
        ),
        MiningEvent::PeerBlockAccepted { block_hash, height, source_peer } => (
            "peer_block_accepted",
            json!({ "block_hash": hex::encode(block_hash), "height": height, "source_peer": source_peer }),
        ),
        MiningEvent::PeerObserved { .. } | MiningEvent::StatusTick => return None,
    };
    Some(json!({ "type": type_name, "timestamp": timestamp, "data": data }))
}
