//! Shared handler state: read-only handles to every subsystem plus the
//! wallet's single write lock, so import/generate/export never race a
//! concurrent read of the active address.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use clawminer_headersync::HeaderSyncService;
use clawminer_mining::{EventBus, MiningService};
use clawminer_network::GossipNode;
use clawminer_store::Store;
use clawminer_wallet::Wallet;

#[derive(Clone)]
pub struct ApiState {
    pub store: Store,
    pub mining: Arc<MiningService>,
    pub gossip: Arc<GossipNode>,
    pub header_sync: Arc<HeaderSyncService>,
    pub wallet: Arc<RwLock<Wallet>>,
    pub events: EventBus,
    pub node_id: String,
    pub started_at: Instant,
}

impl ApiState {
    pub fn uptime_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}
