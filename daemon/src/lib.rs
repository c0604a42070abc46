//! ClawMiner Daemon
//!
//! The orchestrator: boots every subsystem in a fixed order, wires each
//! one's events into the others, and drives shutdown in reverse. `Daemon`
//! holds every `Arc` handle the HTTP API needs in one explicit value
//! rather than reaching for ambient singletons.

pub mod config;
pub mod error;

use std::sync::{Arc, RwLock};
use std::time::Instant;

use clawminer_headersync::HeaderSyncService;
use clawminer_mining::MiningService;
use clawminer_network::{GossipConfig, GossipNode, InboundHandler, ReputationSink};
use clawminer_store::Store;
use clawminer_wallet::Wallet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use config::AppConfig;
pub use error::{Error, Result};

const CONFIG_KEY_NODE_ID: &str = "node_id";
const CONFIG_KEY_WALLET_WIF: &str = "wallet_wif";
const CONFIG_KEY_GOSSIP_IDENTITY: &str = "libp2p_identity_key";

/// Dispatches validated gossip envelopes into the mining service: work
/// item offers feed the mempool, block announcements go through the full
/// peer-block acceptance path.
struct MiningInboundHandler {
    mining: Arc<MiningService>,
}

impl InboundHandler for MiningInboundHandler {
    fn handle(&self, sender_id: &str, envelope: &clawminer_network::Envelope) {
        match envelope.message_type {
            clawminer_network::MessageType::WorkItemOffer => {
                match envelope.decode_work_item_offer() {
                    Ok(offer) => {
                        let item = clawminer_core::WorkItem::new(
                            offer.item_type,
                            hex::decode(&offer.data_hex).unwrap_or_default(),
                            offer.timestamp,
                        );
                        self.mining.submit_work(item);
                    }
                    Err(e) => warn!(peer = sender_id, error = %e, "malformed work item offer"),
                }
            }
            clawminer_network::MessageType::BlockAnnounce => match envelope.decode_block_announce() {
                Ok(payload) => {
                    let mining = self.mining.clone();
                    let sender_id = sender_id.to_string();
                    tokio::task::spawn(async move {
                        if let Err(e) = mining.accept_peer_block_from_gossip(&payload, &sender_id).await {
                            warn!(peer = %sender_id, error = %e, "rejected peer block");
                        }
                    });
                }
                Err(e) => warn!(peer = sender_id, error = %e, "malformed block announce"),
            },
            clawminer_network::MessageType::Other(_) => {}
        }
    }
}

/// Feeds reputation observations from the gossip node into the peer
/// records table.
struct StoreReputationSink {
    store: Store,
}

impl ReputationSink for StoreReputationSink {
    fn observe(&self, peer_id: &str, delta: i64, valid: bool) {
        let seen_at_ms = clawminer_core::now_ms();
        if let Err(e) = self
            .store
            .upsert_peer_observation(peer_id, None, delta, valid, "gossip", seen_at_ms)
        {
            warn!(peer = peer_id, error = %e, "failed to record peer observation");
        }
    }

    fn connection_failed(&self, peer_id: &str) {
        if let Err(e) = self.store.record_connection_failure(peer_id) {
            warn!(peer = peer_id, error = %e, "failed to record connection failure");
        }
    }
}

/// Forwards mined/accepted blocks onto the gossip topic. Holds its own
/// copy of the node's identity because `GossipNode::spawn` consumes the
/// one it was given, and every `publish` call needs to re-sign.
struct GossipAnnouncer {
    gossip: Arc<GossipNode>,
    identity: libp2p::identity::Keypair,
}

#[async_trait::async_trait]
impl clawminer_mining::BlockAnnouncer for GossipAnnouncer {
    async fn announce(&self, block: &clawminer_core::Block, hash: clawminer_core::Hash, height: u64) {
        let payload = clawminer_network::BlockAnnouncePayload {
            hash: hex::encode(hash),
            height,
            miner_address: block.header.miner_address.clone(),
            timestamp: block.header.timestamp,
            bits: block.header.bits,
            target_hex: clawminer_core::pow::target_from_bits(block.header.bits).to_str_radix(16),
            merkle_root: hex::encode(block.header.merkle_root),
            prev_hash: hex::encode(block.header.prev_hash),
            nonce: block.header.nonce,
            version: block.header.version,
            item_count: block.items.len() as u64,
        };
        if let Err(e) = self
            .gossip
            .publish(
                &self.identity,
                clawminer_network::MessageType::BlockAnnounce,
                serde_json::to_value(&payload).expect("payload always serializes"),
                clawminer_core::now_ms(),
            )
            .await
        {
            warn!(error = %e, "failed to announce mined block");
        }
    }
}

/// The orchestrator's live handle set. Stop order runs these down in
/// reverse of `run`'s start order.
pub struct Daemon {
    config: AppConfig,
    store: Store,
    wallet: Arc<RwLock<Wallet>>,
    header_sync: Arc<HeaderSyncService>,
    gossip: Arc<GossipNode>,
    gossip_identity: libp2p::identity::Keypair,
    mining: Arc<MiningService>,
    events: clawminer_mining::EventBus,
    node_id: String,
    started_at: Instant,
}

impl Daemon {
    /// Opens the store, restores or generates wallet and gossip identity,
    /// and constructs (but does not yet start) every subsystem. Only
    /// store-open and gossip-start failures are fatal here.
    pub fn bootstrap(config: AppConfig) -> Result<Self> {
        let store = Store::open(&config.data_dir)?;

        let node_id = match store.get_config(CONFIG_KEY_NODE_ID)? {
            Some(id) => id,
            None => {
                let id = uuid_like_id();
                store.set_config(CONFIG_KEY_NODE_ID, &id)?;
                id
            }
        };

        let wallet = bootstrap_wallet(&store, &config)?;
        let miner_address = config
            .reward_address
            .clone()
            .unwrap_or_else(|| wallet.read().expect("wallet lock poisoned").address());

        let events = clawminer_mining::events::new_event_bus();
        let reputation: Arc<dyn ReputationSink> = Arc::new(StoreReputationSink { store: store.clone() });

        let mining = Arc::new(MiningService::bootstrap(
            config.mining_service_config(),
            store.clone(),
            events.clone(),
            miner_address,
            reputation.clone(),
        )?);

        let header_sync = Arc::new(HeaderSyncService::new(config.header_sync.clone(), store.clone()));

        let identity_bytes = store.get_config(CONFIG_KEY_GOSSIP_IDENTITY)?.and_then(|hex_key| hex::decode(hex_key).ok());
        let (identity, identity_bytes) = clawminer_network::identity::load_or_generate(identity_bytes.as_deref())?;
        store.set_config(CONFIG_KEY_GOSSIP_IDENTITY, &hex::encode(&identity_bytes))?;

        let gossip_config = GossipConfig {
            bootstrap_peers: config.gossip.bootstrap_peers.clone(),
            ..config.gossip.clone()
        };

        let handler: Arc<dyn InboundHandler> = Arc::new(MiningInboundHandler { mining: mining.clone() });

        let gossip = Arc::new(GossipNode::spawn(
            identity.clone(),
            gossip_config,
            handler,
            reputation,
            CancellationToken::new(),
        )?);

        Ok(Self {
            config,
            store,
            wallet,
            header_sync,
            gossip,
            gossip_identity: identity,
            mining,
            events,
            node_id,
            started_at: Instant::now(),
        })
    }

    /// Starts every background task and serves the HTTP API until
    /// `shutdown` is cancelled, then drains in reverse order.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        info!(node_id = %self.node_id, "starting clawminer daemon");

        self.header_sync.clone().start(shutdown.clone());

        let announcer: Arc<dyn clawminer_mining::BlockAnnouncer> = Arc::new(GossipAnnouncer {
            gossip: self.gossip.clone(),
            identity: self.gossip_identity.clone(),
        });
        self.mining.start(announcer, shutdown.clone());
        self.mining.spawn_state_persister(shutdown.clone());

        self.spawn_status_log_ticker(shutdown.clone());

        let api_state = clawminer_api::ApiState {
            store: self.store.clone(),
            mining: self.mining.clone(),
            gossip: self.gossip.clone(),
            header_sync: self.header_sync.clone(),
            wallet: self.wallet.clone(),
            events: self.events.clone(),
            node_id: self.node_id.clone(),
            started_at: self.started_at,
        };

        // `serve` only returns once `shutdown` is already cancelled by the
        // caller (e.g. a signal handler in `clawminer-cli`); everything
        // below is the stop order for the remaining subsystems.
        clawminer_api::serve(api_state, self.config.http_addr, shutdown.clone()).await?;

        info!("http api stopped, draining mining service");
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;

        info!("clawminer daemon shut down cleanly");
        Ok(())
    }

    fn spawn_status_log_ticker(&self, shutdown: CancellationToken) {
        let mining = self.mining.clone();
        tokio::task::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = interval.tick() => {
                        let status = mining.status().await;
                        info!(
                            blocks_mined = status.blocks_mined,
                            mempool_size = status.mempool_size,
                            difficulty = status.difficulty,
                            "status tick"
                        );
                    }
                }
            }
        });
    }
}

/// Resolves the signing wallet only; `config.reward_address`, if set,
/// overrides the address used for reward attribution independently of
/// which key ends up signing broadcasts (applied by the caller).
fn bootstrap_wallet(store: &Store, config: &AppConfig) -> Result<Arc<RwLock<Wallet>>> {
    if let Some(wif) = &config.wallet_wif {
        let wallet = Wallet::load(wif)?;
        store.set_config(CONFIG_KEY_WALLET_WIF, wif)?;
        return Ok(Arc::new(RwLock::new(wallet)));
    }
    if let Some(wif) = store.get_config(CONFIG_KEY_WALLET_WIF)? {
        return Ok(Arc::new(RwLock::new(Wallet::load(&wif)?)));
    }
    let wallet = Wallet::generate();
    store.set_config(CONFIG_KEY_WALLET_WIF, &wallet.wif())?;
    Ok(Arc::new(RwLock::new(wallet)))
}

/// A process-local random identifier; not cryptographically significant,
/// only needed to tell nodes apart in logs and `/status`.
fn uuid_like_id() -> String {
    let bytes: [u8; 16] = clawminer_core::pow::sha256d(format!("{:?}", Instant::now()).as_bytes())[..16]
        .try_into()
        .expect("16-byte slice");
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_opens_store_and_generates_wallet() {
        let _rt = tokio::runtime::Runtime::new().unwrap();
        let _guard = _rt.enter();
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            http_addr: "127.0.0.1:0".parse().unwrap(),
            ..AppConfig::default()
        };
        let daemon = Daemon::bootstrap(config).unwrap();
        assert!(!daemon.node_id.is_empty());
    }

    #[test]
    fn bootstrap_is_idempotent_on_restart() {
        let _rt = tokio::runtime::Runtime::new().unwrap();
        let _guard = _rt.enter();
        let dir = tempfile::tempdir().unwrap();
        let first_node_id = {
            let config = AppConfig {
                data_dir: dir.path().to_path_buf(),
                http_addr: "127.0.0.1:0".parse().unwrap(),
                ..AppConfig::default()
            };
            Daemon::bootstrap(config).unwrap().node_id
        };
        let second_node_id = {
            let config = AppConfig {
                data_dir: dir.path().to_path_buf(),
                http_addr: "127.0.0.1:0".parse().unwrap(),
                ..AppConfig::default()
            };
            Daemon::bootstrap(config).unwrap().node_id
        };
        assert_eq!(first_node_id, second_node_id);
    }

    #[test]
    fn reward_address_overrides_derived_wallet_address() {
        let _rt = tokio::runtime::Runtime::new().unwrap();
        let _guard = _rt.enter();
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            http_addr: "127.0.0.1:0".parse().unwrap(),
            reward_address: Some("reward-attribution-address".into()),
            ..AppConfig::default()
        };
        let daemon = Daemon::bootstrap(config).unwrap();
        assert_eq!(daemon.mining.miner_address(), "reward-attribution-address");
        let signing_address = daemon.wallet.read().unwrap().address();
        assert_ne!(signing_address, "reward-attribution-address");
    }
}
