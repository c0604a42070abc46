//! The gossip node: swarm construction, bootstrap dialing, and the
//! inbound event loop. One `tokio::task::spawn`-ed reader drives the
//! `SwarmEvent` stream per node.

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use libp2p::swarm::DialError;
use libp2p::{
    gossipsub, identify, kad, noise, swarm::SwarmEvent, tcp, yamux, Multiaddr, PeerId, Swarm, SwarmBuilder,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::behaviour::{ClawMinerBehaviour, ClawMinerBehaviourEvent};
use crate::config::GossipConfig;
use crate::envelope::{Envelope, MessageType};
use crate::error::{Error, Result};
use crate::peer_sink::{InboundHandler, ReputationSink};

/// A running gossip node. Cheap to clone: the swarm driver task owns the
/// actual `Swarm`, this handle only holds a publish channel and read-only
/// peer bookkeeping.
#[derive(Clone)]
pub struct GossipNode {
    local_peer_id: PeerId,
    publish_tx: tokio::sync::mpsc::Sender<(String, Vec<u8>)>,
    known_peers: Arc<Mutex<HashSet<PeerId>>>,
    connected_peers: Arc<Mutex<HashSet<PeerId>>>,
}

impl GossipNode {
    /// Builds the transport and behaviour, binds the listener, and spawns
    /// the driver task. `identity` is loaded or generated by the caller
    /// (see `crate::identity::load_or_generate`) so identity persistence
    /// stays the daemon's responsibility.
    pub fn spawn(
        identity: libp2p::identity::Keypair,
        config: GossipConfig,
        handler: Arc<dyn InboundHandler>,
        reputation: Arc<dyn ReputationSink>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let local_peer_id = identity.public().to_peer_id();

        let mut swarm = SwarmBuilder::with_existing_identity(identity.clone())
            .with_tokio()
            .with_tcp(tcp::Config::default(), noise::Config::new, yamux::Config::default)
            .map_err(|e| Error::Transport(e.to_string()))?
            .with_dns()
            .map_err(|e| Error::Transport(e.to_string()))?
            .with_behaviour(|key| {
                let gossipsub_config = gossipsub::ConfigBuilder::default()
                    .heartbeat_interval(Duration::from_secs(1))
                    .validation_mode(gossipsub::ValidationMode::Permissive)
                    .build()
                    .expect("valid gossipsub config");
                let gossipsub = gossipsub::Behaviour::new(
                    gossipsub::MessageAuthenticity::Signed(key.clone()),
                    gossipsub_config,
                )
                .expect("valid gossipsub behaviour");
                let identify = identify::Behaviour::new(identify::Config::new(
                    "/clawminer/1.0.0".into(),
                    key.public(),
                ));
                let kad = kad::Behaviour::new(
                    key.public().to_peer_id(),
                    kad::store::MemoryStore::new(key.public().to_peer_id()),
                );
                ClawMinerBehaviour { gossipsub, identify, kad }
            })
            .map_err(|e| Error::Transport(e.to_string()))?
            .build();

        let topic = gossipsub::IdentTopic::new(config.topic.clone());
        swarm
            .behaviour_mut()
            .gossipsub
            .subscribe(&topic)
            .map_err(|e| Error::PubSub(e.to_string()))?;

        let listen_addr: Multiaddr = format!("/ip4/0.0.0.0/tcp/{}", config.listen_port)
            .parse()
            .expect("valid multiaddr");
        swarm
            .listen_on(listen_addr.clone())
            .map_err(|e| Error::Listen {
                addr: listen_addr.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            })?;

        if !config.enable_dht {
            swarm.behaviour_mut().kad.set_mode(Some(kad::Mode::Client));
        }

        let (publish_tx, publish_rx) = tokio::sync::mpsc::channel::<(String, Vec<u8>)>(256);
        let (dial_tx, dial_rx) = tokio::sync::mpsc::channel::<Multiaddr>(32);
        let known_peers = Arc::new(Mutex::new(HashSet::new()));
        let connected_peers = Arc::new(Mutex::new(HashSet::new()));
        let identity_cache = Arc::new(Mutex::new(HashMap::new()));

        let node = Self {
            local_peer_id,
            publish_tx,
            known_peers: known_peers.clone(),
            connected_peers: connected_peers.clone(),
        };

        let bootstrap_peers = config.bootstrap_peers.clone();
        tokio::task::spawn(dial_bootstrap_peers(
            bootstrap_peers,
            config.dial_backoff_ms,
            config.max_dial_backoff_ms,
            shutdown.clone(),
            dial_tx,
        ));

        tokio::task::spawn(drive_swarm(
            swarm,
            topic,
            publish_rx,
            dial_rx,
            handler,
            reputation,
            known_peers,
            connected_peers,
            identity_cache,
            shutdown,
        ));

        Ok(node)
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    /// Signs and publishes an envelope to the PoI overlay topic. Never
    /// blocks the caller on network I/O: the envelope is queued to the
    /// driver task over a bounded channel.
    pub async fn publish(
        &self,
        identity: &libp2p::identity::Keypair,
        message_type: MessageType,
        payload: serde_json::Value,
        nonce: u64,
    ) -> Result<()> {
        let envelope = Envelope::sign(
            identity,
            hex::encode(self.local_peer_id.to_bytes()),
            message_type,
            payload,
            nonce,
        )?;
        let bytes = serde_json::to_vec(&envelope).map_err(|e| Error::ProtocolViolation(e.to_string()))?;
        self.publish_tx
            .send((envelope.sender_id.clone(), bytes))
            .await
            .map_err(|_| Error::PubSub("driver task gone".into()))
    }

    pub async fn connected_peer_count(&self) -> usize {
        self.connected_peers.lock().await.len()
    }

    pub async fn known_peer_count(&self) -> usize {
        self.known_peers.lock().await.len()
    }
}

/// Parses a `host:port` bootstrap entry into a dialable multiaddr. IPv4
/// literals dial directly; anything else is resolved via the DNS transport
/// wired up in `spawn`.
fn bootstrap_multiaddr(addr_str: &str) -> Result<Multiaddr> {
    let (host, port) = addr_str
        .rsplit_once(':')
        .ok_or_else(|| Error::Dial {
            addr: addr_str.to_string(),
            source: "expected host:port".into(),
        })?;
    let proto = match host.parse::<Ipv4Addr>() {
        Ok(_) => format!("/ip4/{host}/tcp/{port}"),
        Err(_) => format!("/dns4/{host}/tcp/{port}"),
    };
    proto.parse().map_err(|e: libp2p::multiaddr::Error| Error::Dial {
        addr: addr_str.to_string(),
        source: e.into(),
    })
}

/// Re-sends each bootstrap address to the swarm driver on an exponential
/// backoff until shutdown. The driver issues the actual dial and reports
/// success or failure back through `SwarmEvent`s; this task never touches
/// reputation directly.
async fn dial_bootstrap_peers(
    peers: Vec<String>,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    shutdown: CancellationToken,
    dial_tx: tokio::sync::mpsc::Sender<Multiaddr>,
) {
    for addr_str in peers {
        let shutdown = shutdown.clone();
        let dial_tx = dial_tx.clone();
        tokio::task::spawn(async move {
            let mut backoff = initial_backoff_ms;
            loop {
                if shutdown.is_cancelled() {
                    return;
                }
                match bootstrap_multiaddr(&addr_str) {
                    Ok(addr) => {
                        debug!(addr = %addr_str, "dialing bootstrap peer");
                        if dial_tx.send(addr).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(addr = %addr_str, error = %e, "invalid bootstrap address");
                        return;
                    }
                }
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(backoff)) => {}
                    _ = shutdown.cancelled() => return,
                }
                backoff = (backoff * 2).min(max_backoff_ms);
            }
        });
    }
}

#[allow(clippy::too_many_arguments)]
async fn drive_swarm(
    mut swarm: Swarm<ClawMinerBehaviour>,
    topic: gossipsub::IdentTopic,
    mut publish_rx: tokio::sync::mpsc::Receiver<(String, Vec<u8>)>,
    mut dial_rx: tokio::sync::mpsc::Receiver<Multiaddr>,
    handler: Arc<dyn InboundHandler>,
    reputation: Arc<dyn ReputationSink>,
    known_peers: Arc<Mutex<HashSet<PeerId>>>,
    connected_peers: Arc<Mutex<HashSet<PeerId>>>,
    identity_cache: Arc<Mutex<HashMap<PeerId, libp2p::identity::PublicKey>>>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("gossip node shutting down");
                return;
            }
            Some((_sender, bytes)) = publish_rx.recv() => {
                if let Err(e) = swarm.behaviour_mut().gossipsub.publish(topic.clone(), bytes) {
                    warn!(error = %e, "gossip publish failed");
                }
            }
            Some(addr) = dial_rx.recv() => {
                if let Err(e) = swarm.dial(addr.clone()) {
                    warn!(addr = %addr, error = %e, "dial failed");
                    reputation.connection_failed(&addr.to_string());
                }
            }
            event = swarm.select_next_some() => {
                handle_swarm_event(event, &handler, &reputation, &known_peers, &connected_peers, &identity_cache).await;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_swarm_event<THandlerErr>(
    event: SwarmEvent<ClawMinerBehaviourEvent, THandlerErr>,
    handler: &Arc<dyn InboundHandler>,
    reputation: &Arc<dyn ReputationSink>,
    known_peers: &Arc<Mutex<HashSet<PeerId>>>,
    connected_peers: &Arc<Mutex<HashSet<PeerId>>>,
    identity_cache: &Arc<Mutex<HashMap<PeerId, libp2p::identity::PublicKey>>>,
) {
    match event {
        SwarmEvent::ConnectionEstablished { peer_id, .. } => {
            known_peers.lock().await.insert(peer_id);
            connected_peers.lock().await.insert(peer_id);
        }
        SwarmEvent::ConnectionClosed { peer_id, .. } => {
            connected_peers.lock().await.remove(&peer_id);
        }
        SwarmEvent::OutgoingConnectionError { peer_id, error, .. } => {
            match &error {
                DialError::Transport(addrs) => {
                    for (addr, cause) in addrs {
                        warn!(addr = %addr, error = %cause, "outgoing dial failed");
                        reputation.connection_failed(&addr.to_string());
                    }
                }
                other => {
                    if let Some(peer_id) = peer_id {
                        warn!(peer = %peer_id, error = %other, "outgoing dial failed");
                        reputation.connection_failed(&peer_id.to_string());
                    }
                }
            }
        }
        SwarmEvent::Behaviour(ClawMinerBehaviourEvent::Gossipsub(gossipsub::Event::Message {
            propagation_source,
            message,
            ..
        })) => {
            dispatch_inbound(&message.data, &propagation_source.to_string(), handler, reputation, identity_cache).await;
        }
        SwarmEvent::Behaviour(ClawMinerBehaviourEvent::Identify(identify::Event::Received {
            peer_id,
            info,
            ..
        })) => {
            known_peers.lock().await.insert(peer_id);
            identity_cache.lock().await.insert(peer_id, info.public_key);
        }
        _ => {}
    }
}

async fn dispatch_inbound(
    bytes: &[u8],
    propagation_source: &str,
    handler: &Arc<dyn InboundHandler>,
    reputation: &Arc<dyn ReputationSink>,
    identity_cache: &Arc<Mutex<HashMap<PeerId, libp2p::identity::PublicKey>>>,
) {
    let envelope: Envelope = match serde_json::from_slice(bytes) {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, peer = propagation_source, "dropping malformed gossip envelope");
            reputation.observe(propagation_source, -1, false);
            return;
        }
    };

    let peer_id: PeerId = match envelope.sender_id.parse() {
        Ok(id) => id,
        Err(_) => match hex::decode(&envelope.sender_id)
            .ok()
            .and_then(|b| PeerId::from_bytes(&b).ok())
        {
            Some(id) => id,
            None => {
                warn!(peer = propagation_source, "envelope has unparseable sender_id");
                reputation.observe(propagation_source, -1, false);
                return;
            }
        },
    };

    let public_key = identity_cache.lock().await.get(&peer_id).cloned();
    let public_key = match public_key {
        Some(key) => key,
        None => {
            warn!(peer = propagation_source, "no identify record for sender; dropping envelope");
            reputation.observe(propagation_source, -1, false);
            return;
        }
    };

    match envelope.verify(&public_key) {
        Ok(()) => {
            reputation.observe(&envelope.sender_id, 1, true);
            handler.handle(&envelope.sender_id, &envelope);
        }
        Err(_) => {
            reputation.observe(&envelope.sender_id, -1, false);
        }
    }
}
