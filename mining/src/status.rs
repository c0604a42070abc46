//! Status snapshot shapes for `/api/mining/status`.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct NetworkDifficultyStatus {
    pub total_network_blocks: u64,
    pub blocks_in_period: u64,
    pub blocks_until_adjust: u64,
    pub adjustment_period: u64,
    pub target_block_time_s: f64,
    pub target: String,
    pub difficulty: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MiningStatus {
    pub enabled: bool,
    pub hash_rate: f64,
    pub difficulty: u64,
    pub blocks_mined: u64,
    pub mempool_size: usize,
    pub last_block: Option<String>,
    pub miner_address: String,
    pub network: NetworkDifficultyStatus,
}
