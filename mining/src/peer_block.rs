//! Peer block acceptance: validates a `BLOCK_ANNOUNCE` payload against
//! hash and difficulty, then records it without ever minting from it.

use std::sync::Arc;

use clawminer_core::{pow, BlockHeader, DifficultyAdjuster};
use clawminer_network::{BlockAnnouncePayload, ReputationSink};
use clawminer_store::Store;
use tokio::sync::Mutex as AsyncMutex;
use tracing::warn;

use crate::error::{Error, Result};
use crate::events::{Event, EventBus};

/// Reconstructs the header, checks its hash and difficulty, and — if
/// valid — records the block and feeds the difficulty adjuster. Peer
/// blocks are never reconciled against a local fork choice beyond
/// "store with claimed height" (open question, see DESIGN.md).
pub async fn accept_peer_block(
    payload: &BlockAnnouncePayload,
    sender_id: &str,
    store: &Store,
    adjuster: &Arc<AsyncMutex<DifficultyAdjuster>>,
    reputation: &Arc<dyn ReputationSink>,
    events: &EventBus,
) -> Result<()> {
    let claimed_hash = payload
        .hash_bytes()
        .map_err(|e| Error::ValidationReject(e.to_string()))?;
    let merkle_root = payload
        .merkle_root_bytes()
        .map_err(|e| Error::ValidationReject(e.to_string()))?;
    let prev_hash = payload
        .prev_hash_bytes()
        .map_err(|e| Error::ValidationReject(e.to_string()))?;

    let header = BlockHeader {
        version: payload.version,
        prev_hash,
        merkle_root,
        timestamp: payload.timestamp,
        bits: payload.bits,
        nonce: payload.nonce,
        miner_address: payload.miner_address.clone(),
    };

    let computed_hash = pow::calculate_block_hash(&header);
    if computed_hash != claimed_hash {
        warn!(peer = sender_id, "peer block hash mismatch");
        reputation.observe(sender_id, -1, false);
        return Err(Error::ValidationReject("hash_mismatch".into()));
    }

    if !pow::check_difficulty(&computed_hash, header.bits) {
        warn!(peer = sender_id, "peer block below required difficulty");
        reputation.observe(sender_id, -1, false);
        return Err(Error::ValidationReject("insufficient_difficulty".into()));
    }

    store.insert_peer_block_announcement(
        &header,
        &computed_hash,
        payload.height,
        payload.item_count,
        sender_id,
    )?;

    {
        let mut guard = adjuster.lock().await;
        if let Err(e) = guard.record_block(header.timestamp) {
            warn!(error = %e, "difficulty adjuster rejected peer block timestamp");
        }
    }

    reputation.observe(sender_id, 1, true);
    let _ = events.send(Event::PeerBlockAccepted {
        block_hash: computed_hash,
        height: payload.height,
        source_peer: sender_id.to_string(),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawminer_core::{Block, WorkItem, WorkItemType};
    use clawminer_network::NoopReputationSink;

    fn open_tmp() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (Store::open(dir.path()).unwrap(), dir)
    }

    fn trivially_valid_block() -> Block {
        let item = WorkItem::new(WorkItemType::ContentServed, vec![1], 1);
        let max_bits = pow::bits_from_target(&((num_bigint::BigUint::from(1u32) << 256u32) - num_bigint::BigUint::from(1u32)));
        Block::assemble(1, [0u8; 32], vec![item], 1000, max_bits, "addr".into())
    }

    fn payload_from(block: &Block, height: u64) -> BlockAnnouncePayload {
        BlockAnnouncePayload {
            hash: hex::encode(block.hash()),
            height,
            miner_address: block.header.miner_address.clone(),
            timestamp: block.header.timestamp,
            bits: block.header.bits,
            target_hex: pow::target_from_bits(block.header.bits).to_str_radix(16),
            merkle_root: hex::encode(block.header.merkle_root),
            prev_hash: hex::encode(block.header.prev_hash),
            nonce: block.header.nonce,
            version: block.header.version,
            item_count: block.items.len() as u64,
        }
    }

    #[tokio::test]
    async fn valid_block_is_stored_and_window_grows() {
        let (store, _dir) = open_tmp();
        let block = trivially_valid_block();
        let payload = payload_from(&block, 1);
        let adjuster = Arc::new(AsyncMutex::new(DifficultyAdjuster::new(
            pow::target_from_bits(block.header.bits),
            1000,
            20,
        )));
        let reputation: Arc<dyn ReputationSink> = Arc::new(NoopReputationSink);
        let events = crate::events::new_event_bus();

        accept_peer_block(&payload, "peer-1", &store, &adjuster, &reputation, &events)
            .await
            .unwrap();

        let fetched = store.get_block_by_hash(&block.hash()).unwrap().unwrap();
        assert!(!fetched.is_own);
        assert_eq!(fetched.source_peer.as_deref(), Some("peer-1"));
        assert_eq!(adjuster.lock().await.total_blocks(), 1);
    }

    #[tokio::test]
    async fn forged_hash_is_rejected() {
        let (store, _dir) = open_tmp();
        let block = trivially_valid_block();
        let mut payload = payload_from(&block, 1);
        payload.hash = "ff".repeat(32);
        let adjuster = Arc::new(AsyncMutex::new(DifficultyAdjuster::new(
            pow::target_from_bits(block.header.bits),
            1000,
            20,
        )));
        let reputation: Arc<dyn ReputationSink> = Arc::new(NoopReputationSink);
        let events = crate::events::new_event_bus();

        let result = accept_peer_block(&payload, "peer-1", &store, &adjuster, &reputation, &events).await;
        assert!(result.is_err());
        assert!(store.get_block_by_hash(&block.hash()).unwrap().is_none());
    }

    #[tokio::test]
    async fn under_difficulty_block_is_rejected() {
        let (store, _dir) = open_tmp();
        let item = WorkItem::new(WorkItemType::ContentServed, vec![1], 1);
        // minimal target: only a hash of all zero bytes would pass
        let block = Block::assemble(1, [0u8; 32], vec![item], 1000, pow::bits_from_target(&num_bigint::BigUint::from(1u32)), "addr".into());
        let payload = payload_from(&block, 1);
        let adjuster = Arc::new(AsyncMutex::new(DifficultyAdjuster::new(
            pow::target_from_bits(block.header.bits),
            1000,
            20,
        )));
        let reputation: Arc<dyn ReputationSink> = Arc::new(NoopReputationSink);
        let events = crate::events::new_event_bus();

        let result = accept_peer_block(&payload, "peer-1", &store, &adjuster, &reputation, &events).await;
        assert!(result.is_err());
    }
}
