//! ClawMiner Network
//!
//! The libp2p gossip node carrying the PoI overlay's pub-sub topic:
//! stable identity, TCP transport, peer discovery, signed message
//! envelopes, and inbound dispatch to a caller-supplied handler. Every
//! other subsystem (mining, header sync, API) is deliberately unaware of
//! libp2p; they see only `GossipNode`, `Envelope`, and the two callback
//! traits in [`peer_sink`].

pub mod behaviour;
pub mod config;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod node;
pub mod peer_sink;

pub use config::{GossipConfig, GossipConfigBuilder};
pub use envelope::{BlockAnnouncePayload, Envelope, MessageType, WorkItemOfferPayload};
pub use error::{Error, Result};
pub use node::GossipNode;
pub use peer_sink::{InboundHandler, NoopReputationSink, ReputationSink};
