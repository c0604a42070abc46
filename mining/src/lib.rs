//! ClawMiner Mining
//!
//! The mining worker, settlement dispatcher, peer-block acceptance path,
//! and the event bus that connects them to persistence, gossip, and the
//! HTTP/SSE API.

pub mod broadcaster;
pub mod config;
pub mod error;
pub mod events;
pub mod peer_block;
pub mod status;
pub mod worker;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use clawminer_core::{DifficultyAdjuster, Mempool, WorkItem};
use clawminer_network::{BlockAnnouncePayload, ReputationSink};
use clawminer_store::Store;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

pub use broadcaster::{Broadcaster, HttpServiceBroadcaster, NativeBroadcaster, NoopBroadcaster, SettlementJob};
pub use config::{BroadcasterKind, MiningServiceConfig};
pub use error::{Error, Result};
pub use events::{Event, EventBus};
pub use peer_block::accept_peer_block;
pub use status::{MiningStatus, NetworkDifficultyStatus};
pub use worker::{BlockAnnouncer, MiningStats, NoopAnnouncer};

/// Top-level handle the daemon wires at boot: owns the mempool, the
/// difficulty adjuster, mining statistics, and the settlement queue, and
/// exposes the `SubmitWork` write path gossip handlers call into.
pub struct MiningService {
    config: MiningServiceConfig,
    mempool: Arc<Mempool>,
    adjuster: Arc<AsyncMutex<DifficultyAdjuster>>,
    store: Store,
    stats: Arc<MiningStats>,
    miner_address: Arc<RwLock<String>>,
    events: EventBus,
    settlement_tx: tokio::sync::mpsc::Sender<SettlementJob>,
    reputation: Arc<dyn ReputationSink>,
}

impl MiningService {
    /// Builds the service, restoring the difficulty adjuster's state from
    /// the store if present so a restart resumes the sliding window rather
    /// than starting cold. `reputation` receives the validation outcome of
    /// every peer block accepted via
    /// [`MiningService::accept_peer_block_from_gossip`]; pass
    /// `clawminer_network::NoopReputationSink` when running without a
    /// wired gossip node (tests, tools).
    pub fn bootstrap(
        config: MiningServiceConfig,
        store: Store,
        events: EventBus,
        miner_address: String,
        reputation: Arc<dyn ReputationSink>,
    ) -> Result<Self> {
        let mempool = Arc::new(Mempool::new(config.core.mempool_capacity));

        let initial_target = clawminer_core::pow::target_from_bits(config.core.initial_bits);
        let mut adjuster = DifficultyAdjuster::new(
            initial_target,
            config.core.target_block_time_ms,
            config.core.adjustment_period,
        );
        if let Some(state) = store.get_config_json("difficulty.state")? {
            adjuster.restore(state)?;
        }

        let broadcaster: Arc<dyn Broadcaster> = match &config.broadcaster {
            BroadcasterKind::Noop => Arc::new(NoopBroadcaster),
            BroadcasterKind::Native => Arc::new(NativeBroadcaster),
            BroadcasterKind::HttpService { endpoint } => {
                Arc::new(HttpServiceBroadcaster::new(endpoint.clone()))
            }
        };
        let settlement_tx = broadcaster::spawn_dispatcher_pool(broadcaster, events.clone());

        Ok(Self {
            config,
            mempool,
            adjuster: Arc::new(AsyncMutex::new(adjuster)),
            store,
            stats: Arc::new(MiningStats::default()),
            miner_address: Arc::new(RwLock::new(miner_address)),
            events,
            settlement_tx,
            reputation,
        })
    }

    /// Validates and records a gossiped block announcement, penalizing or
    /// rewarding the sender's reputation accordingly. Never mints from a
    /// peer block.
    pub async fn accept_peer_block_from_gossip(
        &self,
        payload: &BlockAnnouncePayload,
        sender_id: &str,
    ) -> Result<()> {
        peer_block::accept_peer_block(
            payload,
            sender_id,
            &self.store,
            &self.adjuster,
            &self.reputation,
            &self.events,
        )
        .await
    }

    /// Spawns the worker task. Call once; the returned handle lets the
    /// caller request shutdown via `shutdown`.
    pub fn start(&self, announcer: Arc<dyn BlockAnnouncer>, shutdown: CancellationToken) {
        worker::spawn_worker(
            self.config.clone(),
            self.mempool.clone(),
            self.adjuster.clone(),
            self.store.clone(),
            announcer,
            self.settlement_tx.clone(),
            self.events.clone(),
            self.miner_address.clone(),
            self.stats.clone(),
            shutdown,
        );
    }

    /// Periodically persists the difficulty adjuster's state so a restart
    /// resumes the sliding window rather than starting cold.
    pub fn spawn_state_persister(&self, shutdown: CancellationToken) {
        let adjuster = self.adjuster.clone();
        let store = self.store.clone();
        tokio::task::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(10));
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = interval.tick() => {
                        let snapshot = adjuster.lock().await.snapshot();
                        let _ = store.set_config_json("difficulty.state", &snapshot);
                    }
                }
            }
        });
    }

    /// The only write path into the mempool; safe to call from any thread.
    pub fn submit_work(&self, item: WorkItem) -> bool {
        self.mempool.submit(item)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.stats.set_enabled(enabled);
    }

    pub fn set_miner_address(&self, address: String) {
        *self.miner_address.write().expect("wallet lock poisoned") = address;
    }

    pub fn miner_address(&self) -> String {
        self.miner_address.read().expect("wallet lock poisoned").clone()
    }

    pub async fn status(&self) -> MiningStatus {
        let adjuster = self.adjuster.lock().await;
        let hashes = self.stats.take_hash_count();
        MiningStatus {
            enabled: self.stats.is_enabled(),
            hash_rate: hashes as f64 / 5.0,
            difficulty: adjuster.difficulty(),
            blocks_mined: self.stats.blocks_mined(),
            mempool_size: self.mempool.size(),
            last_block: self.stats.last_block_hash().map(hex::encode),
            miner_address: self.miner_address(),
            network: NetworkDifficultyStatus {
                total_network_blocks: adjuster.total_blocks(),
                blocks_in_period: adjuster.total_blocks() % adjuster.adjustment_period().max(1),
                blocks_until_adjust: adjuster.blocks_until_adjust(),
                adjustment_period: adjuster.adjustment_period(),
                target_block_time_s: self.config.core.target_block_time_ms as f64 / 1000.0,
                target: adjuster.target_hex(),
                difficulty: adjuster.difficulty(),
            },
        }
    }

    pub fn adjuster(&self) -> Arc<AsyncMutex<DifficultyAdjuster>> {
        self.adjuster.clone()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn events(&self) -> EventBus {
        self.events.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawminer_core::WorkItemType;
    use clawminer_network::NoopReputationSink;

    fn open_tmp() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (Store::open(dir.path()).unwrap(), dir)
    }

    #[tokio::test]
    async fn submit_work_feeds_mempool_and_status_reports_it() {
        let (store, _dir) = open_tmp();
        let events = events::new_event_bus();
        let service = MiningService::bootstrap(
            MiningServiceConfig::default(),
            store,
            events,
            "addr".into(),
            Arc::new(NoopReputationSink),
        )
        .unwrap();
        assert!(service.submit_work(WorkItem::new(WorkItemType::ContentServed, vec![1], 1)));
        let status = service.status().await;
        assert_eq!(status.mempool_size, 1);
        assert_eq!(status.miner_address, "addr");
    }

    #[tokio::test]
    async fn wallet_hot_swap_updates_miner_address() {
        let (store, _dir) = open_tmp();
        let events = events::new_event_bus();
        let service = MiningService::bootstrap(
            MiningServiceConfig::default(),
            store,
            events,
            "W1".into(),
            Arc::new(NoopReputationSink),
        )
        .unwrap();
        service.set_miner_address("W2".into());
        assert_eq!(service.miner_address(), "W2");
    }
}
