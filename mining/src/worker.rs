//! The mining worker: a cooperative loop draining the mempool, searching
//! nonces, and handing mined blocks to storage, gossip announcement, and
//! settlement.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clawminer_core::{Block, DifficultyAdjuster, Hash, Mempool};
use clawminer_store::Store;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::broadcaster::{SettlementJob, SettlementRequest};
use crate::config::MiningServiceConfig;
use crate::events::{block_mined_event, Event, EventBus};

/// Publishes a mined block to the gossip overlay. Implemented by
/// `clawminer-network`'s `GossipNode`, kept as a trait here so the mining
/// crate has no direct libp2p dependency.
#[async_trait::async_trait]
pub trait BlockAnnouncer: Send + Sync {
    async fn announce(&self, block: &Block, hash: Hash, height: u64);
}

pub struct NoopAnnouncer;

#[async_trait::async_trait]
impl BlockAnnouncer for NoopAnnouncer {
    async fn announce(&self, _block: &Block, _hash: Hash, _height: u64) {}
}

/// Read-only counters exposed to `/api/mining/status` without taking any
/// lock the worker itself holds.
#[derive(Default)]
pub struct MiningStats {
    blocks_mined: AtomicU64,
    hashes_this_period: AtomicU64,
    last_block_hash: std::sync::Mutex<Option<Hash>>,
    enabled: AtomicBool,
}

impl MiningStats {
    pub fn blocks_mined(&self) -> u64 {
        self.blocks_mined.load(Ordering::Relaxed)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn last_block_hash(&self) -> Option<Hash> {
        *self.last_block_hash.lock().expect("stats mutex poisoned")
    }

    fn record_block(&self, hash: Hash) {
        self.blocks_mined.fetch_add(1, Ordering::Relaxed);
        *self.last_block_hash.lock().expect("stats mutex poisoned") = Some(hash);
    }

    fn record_hashes(&self, n: u64) {
        self.hashes_this_period.fetch_add(n, Ordering::Relaxed);
    }

    /// Drains the hash counter, returning the count since the last call.
    /// Used by the status ticker to compute a rolling hash rate.
    pub fn take_hash_count(&self) -> u64 {
        self.hashes_this_period.swap(0, Ordering::Relaxed)
    }
}

#[allow(clippy::too_many_arguments)]
pub fn spawn_worker(
    config: MiningServiceConfig,
    mempool: Arc<Mempool>,
    adjuster: Arc<AsyncMutex<DifficultyAdjuster>>,
    store: Store,
    announcer: Arc<dyn BlockAnnouncer>,
    settlement_tx: tokio::sync::mpsc::Sender<SettlementJob>,
    events: EventBus,
    miner_address: Arc<std::sync::RwLock<String>>,
    stats: Arc<MiningStats>,
    shutdown: CancellationToken,
) {
    stats.set_enabled(config.enabled_at_boot);
    tokio::task::spawn(async move {
        loop {
            if shutdown.is_cancelled() {
                info!("mining worker shutting down");
                return;
            }

            if !stats.is_enabled() {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(200)) => continue,
                    _ = shutdown.cancelled() => return,
                }
            }

            if mempool.size() < config.core.min_items {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(100)) => continue,
                    _ = shutdown.cancelled() => return,
                }
            }

            let items = mempool.drain(config.core.batch_size);
            if items.is_empty() {
                continue;
            }

            let (tip_hash, tip_height) = match store.tip() {
                Ok(Some((height, hash))) => (hash, height),
                Ok(None) => (clawminer_core::GENESIS_PREV_HASH, 0),
                Err(e) => {
                    warn!(error = %e, "failed to read chain tip, skipping assembly");
                    continue;
                }
            };

            let bits = {
                let guard = adjuster.lock().await;
                guard.bits()
            };
            let address = miner_address.read().expect("wallet lock poisoned").clone();
            let mut block = Block::assemble(
                config.core.block_version,
                tip_hash,
                items,
                clawminer_core::now_ms(),
                bits,
                address,
            );

            let found = search_nonce(&mut block, config.nonce_quantum, &stats, &shutdown).await;
            if !found {
                continue;
            }

            let hash = block.hash();
            let height = tip_height + 1;

            if let Err(e) = store.insert_block(&block, height, true, None) {
                warn!(error = %e, "failed to persist mined block");
                continue;
            }

            {
                let mut guard = adjuster.lock().await;
                if let Err(e) = guard.record_block(block.header.timestamp) {
                    warn!(error = %e, "difficulty adjuster rejected own block timestamp");
                }
            }

            stats.record_block(hash);
            announcer.announce(&block, hash, height).await;
            let _ = events.send(block_mined_event(&block, hash, height));

            if settlement_tx
                .try_send(SettlementJob {
                    request: SettlementRequest {
                        miner_address: block.header.miner_address.clone(),
                        amount: 0,
                        nonce: block.header.nonce,
                        work_commitment: hex::encode(block.header.merkle_root),
                        block_hash: hex::encode(hash),
                    },
                })
                .is_err()
            {
                warn!("settlement queue full, dropping job for block {}", hex::encode(hash));
            }
        }
    });
}

/// Searches nonces in bounded quanta, yielding between quanta so the task
/// observes shutdown promptly even under continuous mining.
async fn search_nonce(
    block: &mut Block,
    quantum: u64,
    stats: &MiningStats,
    shutdown: &CancellationToken,
) -> bool {
    loop {
        for _ in 0..quantum {
            if clawminer_core::pow::check_difficulty(&block.hash(), block.header.bits) {
                stats.record_hashes(quantum);
                return true;
            }
            block.header.nonce = block.header.nonce.wrapping_add(1);
        }
        stats.record_hashes(quantum);
        if shutdown.is_cancelled() {
            return false;
        }
        tokio::task::yield_now().await;
    }
}
