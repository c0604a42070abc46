//! Header-sync configuration, in the `obscura-core` fluent-builder idiom.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeaderSyncConfig {
    /// Block Headers Service base URL. `None` disables header sync entirely.
    pub bhs_url: Option<String>,
    pub api_key: Option<String>,
    pub poll_interval_ms: u64,
    pub batch_size: u64,
    pub max_retries: u32,
    pub sync_on_boot: bool,
}

impl Default for HeaderSyncConfig {
    fn default() -> Self {
        Self {
            bhs_url: None,
            api_key: None,
            poll_interval_ms: 30_000,
            batch_size: 2_000,
            max_retries: 5,
            sync_on_boot: true,
        }
    }
}

/// Fluent builder for [`HeaderSyncConfig`].
pub struct HeaderSyncConfigBuilder {
    inner: HeaderSyncConfig,
}

impl HeaderSyncConfigBuilder {
    pub fn new() -> Self {
        Self {
            inner: HeaderSyncConfig::default(),
        }
    }

    pub fn bhs_url<S: Into<String>>(mut self, url: S) -> Self {
        self.inner.bhs_url = Some(url.into());
        self
    }

    pub fn api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.inner.api_key = Some(key.into());
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.inner.poll_interval_ms = ms;
        self
    }

    pub fn batch_size(mut self, n: u64) -> Self {
        self.inner.batch_size = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.inner.max_retries = n;
        self
    }

    pub fn sync_on_boot(mut self, enabled: bool) -> Self {
        self.inner.sync_on_boot = enabled;
        self
    }

    pub fn finish(self) -> HeaderSyncConfig {
        self.inner
    }
}

impl Default for HeaderSyncConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_disabled_with_no_url() {
        let cfg = HeaderSyncConfig::default();
        assert!(cfg.bhs_url.is_none());
    }

    #[test]
    fn builder_overrides_fields() {
        let cfg = HeaderSyncConfigBuilder::new()
            .bhs_url("https://bhs.example.com")
            .poll_interval_ms(5_000)
            .batch_size(100)
            .max_retries(2)
            .finish();
        assert_eq!(cfg.bhs_url.as_deref(), Some("https://bhs.example.com"));
        assert_eq!(cfg.poll_interval_ms, 5_000);
        assert_eq!(cfg.batch_size, 100);
        assert_eq!(cfg.max_retries, 2);
    }
}
