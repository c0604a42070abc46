//! ClawMiner Core Library
//!
//! Fundamental PoI block data structures and the pure consensus helpers
//! every other crate in the workspace builds on: the block/header model,
//! the work-item mempool, the proof-of-work target check, and the
//! difficulty adjuster.

pub mod block;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod mempool;
pub mod merkle;
pub mod pow;
pub mod work_item;

pub use block::{Block, BlockHeader, GENESIS_PREV_HASH};
pub use difficulty::{AdjusterState, DifficultyAdjuster};
pub use error::{Error, Result};
pub use mempool::Mempool;
pub use work_item::{WorkItem, WorkItemType};

/// A 32-byte content hash, used for block hashes, work-item ids, and merkle nodes.
pub type Hash = [u8; 32];

/// Returns the current UNIX timestamp in milliseconds, as all timestamps in
/// this crate are expressed in ms.
pub fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as u64
}
