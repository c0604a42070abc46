//! Gossip node configuration, in the `obscura-core` fluent-builder idiom
//! (see `clawminer_core::config::MiningConfig`).

use serde::{Deserialize, Serialize};

/// Tunables governing transport, discovery, and the pub-sub topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GossipConfig {
    /// TCP port the node listens on; 0 lets the OS pick an ephemeral port.
    pub listen_port: u16,
    /// Pub-sub topic carrying all PoI overlay control messages.
    pub topic: String,
    /// `host:port` entries dialed at startup with exponential backoff.
    pub bootstrap_peers: Vec<String>,
    /// Enables the Kademlia DHT for routing-table bootstrap.
    pub enable_dht: bool,
    /// Initial backoff before the first bootstrap redial attempt.
    pub dial_backoff_ms: u64,
    /// Ceiling on exponential backoff between bootstrap redial attempts.
    pub max_dial_backoff_ms: u64,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            listen_port: 0,
            topic: "clawminer-poi-overlay".into(),
            bootstrap_peers: Vec::new(),
            enable_dht: false,
            dial_backoff_ms: 500,
            max_dial_backoff_ms: 30_000,
        }
    }
}

/// Fluent builder for [`GossipConfig`].
pub struct GossipConfigBuilder {
    inner: GossipConfig,
}

impl GossipConfigBuilder {
    pub fn new() -> Self {
        Self {
            inner: GossipConfig::default(),
        }
    }

    pub fn listen_port(mut self, port: u16) -> Self {
        self.inner.listen_port = port;
        self
    }

    pub fn topic<S: Into<String>>(mut self, topic: S) -> Self {
        self.inner.topic = topic.into();
        self
    }

    pub fn bootstrap_peers(mut self, peers: Vec<String>) -> Self {
        self.inner.bootstrap_peers = peers;
        self
    }

    pub fn enable_dht(mut self, enabled: bool) -> Self {
        self.inner.enable_dht = enabled;
        self
    }

    pub fn finish(self) -> GossipConfig {
        self.inner
    }
}

impl Default for GossipConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_fields() {
        let cfg = GossipConfigBuilder::new()
            .listen_port(4001)
            .topic("test-topic")
            .bootstrap_peers(vec!["127.0.0.1:4001".into()])
            .enable_dht(true)
            .finish();
        assert_eq!(cfg.listen_port, 4001);
        assert_eq!(cfg.topic, "test-topic");
        assert_eq!(cfg.bootstrap_peers.len(), 1);
        assert!(cfg.enable_dht);
    }
}
