//! Typed events carried on the orchestrator's event bus. Producers (mining
//! worker, network handler) send; consumers (persistence, gossip publish,
//! SSE bus) subscribe independently via `tokio::sync::broadcast`.

use clawminer_core::{Block, Hash};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    BlockMined {
        block_hash: Hash,
        height: u64,
        item_count: usize,
    },
    PeerBlockAccepted {
        block_hash: Hash,
        height: u64,
        source_peer: String,
    },
    MintClaimed {
        txid: String,
        amount: u64,
        block_hash: Hash,
    },
    PeerObserved {
        peer_id: String,
        reputation_delta: i64,
    },
    StatusTick,
}

/// Event bus capacity: generous enough that a slow SSE subscriber lagging
/// briefly doesn't force producers to block (broadcast channels drop the
/// oldest message for lagging receivers rather than stalling senders).
pub const EVENT_BUS_CAPACITY: usize = 1024;

pub type EventBus = tokio::sync::broadcast::Sender<Event>;

pub fn new_event_bus() -> EventBus {
    let (tx, _rx) = tokio::sync::broadcast::channel(EVENT_BUS_CAPACITY);
    tx
}

/// Convenience trait so callers don't need to import `Block` just to build
/// a `BlockMined` event from a freshly assembled one.
pub fn block_mined_event(block: &Block, hash: Hash, height: u64) -> Event {
    Event::BlockMined {
        block_hash: hash,
        height,
        item_count: block.items.len(),
    }
}
