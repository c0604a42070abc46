//! Consensus-level configuration for **ClawMiner** core.
//!
//! [`MiningConfig`] centralises the tunables the core crate itself needs to
//! reason about blocks and difficulty: mempool sizing, assembly thresholds,
//! and the adjuster's cadence. It is constructed via [`MiningConfigBuilder`]
//! using the fluent builder pattern, enabling callers to customise only the
//! fields they care about while keeping sensible defaults. Subsystem-level
//! configuration (store path, network ports, BHS url, ...) is aggregated one
//! layer up, in `clawminer-daemon::config::AppConfig`.
//!
//! ```
//! use clawminer_core::config::MiningConfig;
//!
//! let cfg = MiningConfig::default();
//! assert_eq!(cfg.min_items, 1);
//! ```

use serde::{Deserialize, Serialize};

/// Tunables governing block assembly and the difficulty adjuster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MiningConfig {
    /// Minimum mempool size before a block may be assembled.
    pub min_items: usize,
    /// Maximum work items drained into a single block.
    pub batch_size: usize,
    /// Mempool capacity before oldest items are evicted.
    pub mempool_capacity: usize,
    /// Target milliseconds between blocks, feeding the difficulty adjuster.
    pub target_block_time_ms: u64,
    /// Number of blocks between difficulty rescales.
    pub adjustment_period: u64,
    /// Compact `bits` encoding of the genesis/initial difficulty target.
    pub initial_bits: u32,
    /// Block header version written into newly assembled blocks.
    pub block_version: u32,
    /// Human-readable network name (e.g. "main", "test").
    pub network: String,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            min_items: 1,
            batch_size: 500,
            mempool_capacity: 50_000,
            target_block_time_ms: 30_000,
            adjustment_period: 20,
            // exponent 0x1e, mantissa 0x00ffff: a deliberately easy default target.
            initial_bits: 0x1e00_ffff,
            block_version: 1,
            network: "main".into(),
        }
    }
}

/// Fluent builder for [`MiningConfig`].
pub struct MiningConfigBuilder {
    inner: MiningConfig,
}

impl MiningConfigBuilder {
    /// Starts a new builder pre-populated with [`MiningConfig::default`].
    pub fn new() -> Self {
        Self {
            inner: MiningConfig::default(),
        }
    }

    pub fn min_items(mut self, n: usize) -> Self {
        self.inner.min_items = n;
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.inner.batch_size = n;
        self
    }

    pub fn mempool_capacity(mut self, n: usize) -> Self {
        self.inner.mempool_capacity = n;
        self
    }

    pub fn target_block_time_ms(mut self, ms: u64) -> Self {
        self.inner.target_block_time_ms = ms;
        self
    }

    pub fn adjustment_period(mut self, n: u64) -> Self {
        self.inner.adjustment_period = n;
        self
    }

    pub fn initial_bits(mut self, bits: u32) -> Self {
        self.inner.initial_bits = bits;
        self
    }

    pub fn network<S: Into<String>>(mut self, name: S) -> Self {
        self.inner.network = name.into();
        self
    }

    /// Consumes the builder returning an immutable configuration value.
    pub fn finish(self) -> MiningConfig {
        self.inner
    }
}

impl Default for MiningConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_fields() {
        let cfg = MiningConfigBuilder::new()
            .min_items(4)
            .batch_size(10)
            .adjustment_period(16)
            .network("test")
            .finish();
        assert_eq!(cfg.min_items, 4);
        assert_eq!(cfg.batch_size, 10);
        assert_eq!(cfg.adjustment_period, 16);
        assert_eq!(cfg.network, "test");
    }
}
