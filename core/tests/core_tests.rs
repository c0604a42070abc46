use clawminer_core::block::{Block, GENESIS_PREV_HASH};
use clawminer_core::difficulty::{AdjusterState, DifficultyAdjuster};
use clawminer_core::mempool::Mempool;
use clawminer_core::pow::{bits_from_target, check_difficulty, target_from_bits};
use clawminer_core::work_item::{WorkItem, WorkItemType};
use num_bigint::BigUint;
use num_traits::One;

fn max_bits() -> u32 {
    bits_from_target(&((BigUint::one() << 256u32) - BigUint::one()))
}

#[test]
fn mining_at_trivial_difficulty_finds_a_nonce_immediately() {
    let item = WorkItem::new(WorkItemType::ContentServed, vec![1, 2, 3], 1000);
    let mut block = Block::assemble(1, GENESIS_PREV_HASH, vec![item], 1000, max_bits(), "miner".into());
    // linear nonce search, bounded because difficulty is trivial
    let mut nonce = 0u64;
    while !check_difficulty(&block.hash(), block.header.bits) && nonce < 10_000 {
        nonce += 1;
        block.header.nonce = nonce;
    }
    assert!(check_difficulty(&block.hash(), block.header.bits));
    assert!(block.is_structurally_valid(&GENESIS_PREV_HASH));
}

#[test]
fn mempool_feeds_deterministic_block_assembly() {
    let pool = Mempool::new(100);
    for n in 0..5u8 {
        pool.submit(WorkItem::new(WorkItemType::PeerRelayed, vec![n], n as u64));
    }
    assert_eq!(pool.size(), 5);
    let drained = pool.drain(10);
    assert_eq!(drained.len(), 5);
    assert_eq!(pool.size(), 0);

    let block = Block::assemble(1, GENESIS_PREV_HASH, drained, 5000, max_bits(), "miner".into());
    assert!(block.merkle_root_matches());
}

#[test]
fn difficulty_adjuster_restore_then_rescale_round_trip() {
    let mut adj = DifficultyAdjuster::new(target_from_bits(max_bits()), 1000, 4);
    let snapshot = adj.snapshot();
    let mut restored = DifficultyAdjuster::new(BigUint::one(), 1000, 4);
    restored.restore(AdjusterState {
        target_hex: snapshot.target_hex.clone(),
        total_blocks: snapshot.total_blocks,
        recent_timestamps_ms: snapshot.recent_timestamps_ms.clone(),
    })
    .unwrap();
    assert_eq!(restored.target_hex(), adj.target_hex());

    let before = restored.target().clone();
    for i in 0..4u64 {
        restored.record_block(i * 100).unwrap();
    }
    assert!(restored.target() < &before);
}
