//! Row types returned by store queries.

use serde::{Deserialize, Serialize};

use clawminer_core::{Block, Hash};

/// A block as persisted, with the storage-assigned height and provenance
/// tag the in-memory `Block` type doesn't carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBlock {
    pub block: Block,
    pub hash: Hash,
    pub height: u64,
    pub is_own: bool,
    pub source_peer: Option<String>,
    /// Claimed item count. For own blocks this equals `block.items.len()`;
    /// for peer announcements the item list itself is never transmitted,
    /// so this is the only record of how large the block claimed to be.
    pub item_count: u64,
}

/// Aggregate block counts for `/api/blocks/count`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlockCounts {
    pub own: u64,
    pub total: u64,
}

/// An SPV header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredHeader {
    pub height: u64,
    pub hash: Hash,
    pub version: u32,
    pub merkle_root: Hash,
    pub timestamp_ms: u64,
    pub bits: u32,
    pub nonce: u64,
    pub prev_hash: Hash,
}

/// A gossip peer's observed reputation and connectivity history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerRecord {
    pub peer_id: String,
    pub address: Option<String>,
    pub reputation: i64,
    pub valid_count: i64,
    pub invalid_count: i64,
    pub connection_failures: i64,
    pub status: String,
    pub discovery_source: String,
    pub last_seen_ms: Option<u64>,
}
