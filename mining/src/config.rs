//! Mining service configuration: which broadcaster backend to use and
//! whether mining starts enabled. Consensus tunables (mempool capacity,
//! batch size, difficulty parameters) live in `clawminer_core::MiningConfig`
//! one layer down; this is the service-level wrapper around it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum BroadcasterKind {
    Noop,
    Native,
    HttpService { endpoint: String },
}

impl Default for BroadcasterKind {
    fn default() -> Self {
        BroadcasterKind::Noop
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MiningServiceConfig {
    pub core: clawminer_core::config::MiningConfig,
    pub enabled_at_boot: bool,
    pub broadcaster: BroadcasterKind,
    /// Bounded inner nonce-search loop length before the worker yields and
    /// checks the shutdown signal.
    pub nonce_quantum: u64,
}

impl Default for MiningServiceConfig {
    fn default() -> Self {
        Self {
            core: clawminer_core::config::MiningConfig::default(),
            enabled_at_boot: true,
            broadcaster: BroadcasterKind::default(),
            nonce_quantum: 200_000,
        }
    }
}

/// Fluent builder for [`MiningServiceConfig`].
pub struct MiningServiceConfigBuilder {
    inner: MiningServiceConfig,
}

impl MiningServiceConfigBuilder {
    pub fn new() -> Self {
        Self {
            inner: MiningServiceConfig::default(),
        }
    }

    pub fn core(mut self, core: clawminer_core::config::MiningConfig) -> Self {
        self.inner.core = core;
        self
    }

    pub fn enabled_at_boot(mut self, enabled: bool) -> Self {
        self.inner.enabled_at_boot = enabled;
        self
    }

    pub fn broadcaster(mut self, kind: BroadcasterKind) -> Self {
        self.inner.broadcaster = kind;
        self
    }

    pub fn nonce_quantum(mut self, n: u64) -> Self {
        self.inner.nonce_quantum = n;
        self
    }

    pub fn finish(self) -> MiningServiceConfig {
        self.inner
    }
}

impl Default for MiningServiceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_noop_broadcaster_and_enabled() {
        let cfg = MiningServiceConfig::default();
        assert_eq!(cfg.broadcaster, BroadcasterKind::Noop);
        assert!(cfg.enabled_at_boot);
    }

    #[test]
    fn builder_overrides_fields() {
        let cfg = MiningServiceConfigBuilder::new()
            .enabled_at_boot(false)
            .broadcaster(BroadcasterKind::HttpService {
                endpoint: "https://settle.example.com".into(),
            })
            .nonce_quantum(50_000)
            .finish();
        assert!(!cfg.enabled_at_boot);
        assert_eq!(cfg.nonce_quantum, 50_000);
    }
}
