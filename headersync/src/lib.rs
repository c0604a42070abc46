//! ClawMiner Header Sync
//!
//! Keeps a local copy of canonical block headers for SPV-style
//! merkle-root validation, pulled from an external Block Headers Service.
//! Disabled when no BHS URL is configured.

pub mod client;
pub mod config;
pub mod error;
pub mod progress;

use std::sync::Arc;
use std::time::Duration;

use clawminer_core::Hash;
use clawminer_store::{Store, StoredHeader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use client::{BhsClient, RemoteHeader};
pub use config::{HeaderSyncConfig, HeaderSyncConfigBuilder};
pub use error::{Error, Result};
pub use progress::{ProgressHandle, ProgressSnapshot};

fn decode_hash(s: &str) -> Result<Hash> {
    let bytes = hex::decode(s).map_err(|e| Error::ProtocolViolation(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(Error::ProtocolViolation(format!(
            "expected 32-byte hash, got {} bytes",
            bytes.len()
        )));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

impl TryFrom<RemoteHeader> for StoredHeader {
    type Error = Error;

    fn try_from(h: RemoteHeader) -> Result<Self> {
        Ok(StoredHeader {
            height: h.height,
            hash: decode_hash(&h.hash)?,
            version: h.version,
            merkle_root: decode_hash(&h.merkle_root)?,
            timestamp_ms: h.timestamp_ms,
            bits: h.bits,
            nonce: h.nonce,
            prev_hash: decode_hash(&h.prev_hash)?,
        })
    }
}

/// Background header-sync service: owns the BHS client, the poll loop,
/// and the progress snapshot. Disabled (a no-op `Start`) when `config`
/// carries no `bhs_url`.
pub struct HeaderSyncService {
    client: Option<BhsClient>,
    config: HeaderSyncConfig,
    store: Store,
    progress: ProgressHandle,
}

impl HeaderSyncService {
    pub fn new(config: HeaderSyncConfig, store: Store) -> Self {
        let client = config
            .bhs_url
            .clone()
            .map(|url| BhsClient::new(url, config.api_key.clone()));
        Self {
            client,
            config,
            store,
            progress: ProgressHandle::new(),
        }
    }

    pub fn progress(&self) -> ProgressHandle {
        self.progress.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Spawns the sync loop. Returns immediately (logs and does nothing
    /// further) if header sync is disabled.
    pub fn start(self: Arc<Self>, shutdown: CancellationToken) {
        let Some(client) = self.client.clone() else {
            info!("header sync disabled: no BHS url configured");
            return;
        };

        let service = self.clone();
        tokio::task::spawn(async move {
            if service.config.sync_on_boot {
                service.progress.set_syncing(true);
                if let Err(e) = service.run_full_sync(&client, &shutdown).await {
                    warn!(error = %e, "initial header sync failed");
                }
                service.progress.set_syncing(false);
            }

            let mut interval = tokio::time::interval(Duration::from_millis(service.config.poll_interval_ms));
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("header sync shutting down");
                        return;
                    }
                    _ = interval.tick() => {
                        service.progress.set_syncing(true);
                        if let Err(e) = service.run_incremental_sync(&client, &shutdown).await {
                            warn!(error = %e, "incremental header sync failed");
                        }
                        service.progress.set_syncing(false);
                    }
                }
            }
        });
    }

    async fn run_full_sync(&self, client: &BhsClient, shutdown: &CancellationToken) -> Result<()> {
        self.sync_from(0, client, shutdown).await
    }

    async fn run_incremental_sync(&self, client: &BhsClient, shutdown: &CancellationToken) -> Result<()> {
        let local_highest = self.store.highest_header_height()?.map(|h| h + 1).unwrap_or(0);
        self.sync_from(local_highest, client, shutdown).await
    }

    async fn sync_from(&self, start_height: u64, client: &BhsClient, shutdown: &CancellationToken) -> Result<()> {
        let tip = client.chain_tip_height().await?;
        self.progress.set_chain_tip_height(tip);
        if start_height > tip {
            return Ok(());
        }

        let mut batch: Vec<StoredHeader> = Vec::new();
        let mut height = start_height;
        while height <= tip {
            if shutdown.is_cancelled() {
                break;
            }

            let remote = self.fetch_with_retry(client, height).await?;
            match remote {
                Some(header) => batch.push(header.try_into()?),
                None => {
                    // exhausted retries for this height; pause, resume next tick
                    break;
                }
            }

            if batch.len() as u64 >= self.config.batch_size || height == tip {
                self.store.insert_headers_batch(&batch)?;
                self.progress.set_highest_height(height);
                if let Ok(Some(total)) = self.store.highest_header_height() {
                    self.progress.set_total_headers(total + 1);
                }
                batch.clear();
            }

            height += 1;
        }

        if !batch.is_empty() {
            self.store.insert_headers_batch(&batch)?;
        }
        self.progress.touch_synced_at(clawminer_core::now_ms());
        Ok(())
    }

    async fn fetch_with_retry(&self, client: &BhsClient, height: u64) -> Result<Option<RemoteHeader>> {
        let mut attempt = 0;
        loop {
            match client.fetch_header(height).await {
                Ok(header) => return Ok(Some(header)),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.config.max_retries {
                        warn!(height, error = %e, "giving up on header after max retries");
                        return Ok(None);
                    }
                    tokio::time::sleep(Duration::from_millis(200 * attempt as u64)).await;
                }
            }
        }
    }

    /// Checks the local store first; falls back to a remote BHS query if
    /// not present and header sync is enabled.
    pub async fn validate_merkle_root(&self, root: &Hash, height: u64) -> Result<bool> {
        if self.store.has_merkle_root(root, height)? {
            return Ok(true);
        }
        match &self.client {
            Some(client) => client.validate_merkle_root(&hex::encode(root), height).await,
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_tmp_store() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (Store::open(dir.path()).unwrap(), dir)
    }

    #[test]
    fn remote_header_converts_to_stored_header() {
        let remote = RemoteHeader {
            height: 3,
            hash: "11".repeat(32),
            version: 1,
            merkle_root: "22".repeat(32),
            timestamp_ms: 1000,
            bits: 0x1e00ffff,
            nonce: 7,
            prev_hash: "00".repeat(32),
        };
        let stored: StoredHeader = remote.try_into().unwrap();
        assert_eq!(stored.height, 3);
        assert_eq!(stored.hash, [0x11u8; 32]);
    }

    #[test]
    fn malformed_hash_rejected() {
        let remote = RemoteHeader {
            height: 1,
            hash: "not-hex".into(),
            version: 1,
            merkle_root: "22".repeat(32),
            timestamp_ms: 1000,
            bits: 0x1e00ffff,
            nonce: 0,
            prev_hash: "00".repeat(32),
        };
        let result: Result<StoredHeader> = remote.try_into();
        assert!(result.is_err());
    }

    #[test]
    fn disabled_without_bhs_url() {
        let (store, _dir) = open_tmp_store();
        let service = HeaderSyncService::new(HeaderSyncConfig::default(), store);
        assert!(!service.is_enabled());
    }

    #[tokio::test]
    async fn validate_merkle_root_checks_local_store_first() {
        let (store, _dir) = open_tmp_store();
        store
            .insert_headers_batch(&[StoredHeader {
                height: 1,
                hash: [1u8; 32],
                version: 1,
                merkle_root: [9u8; 32],
                timestamp_ms: 1000,
                bits: 0x1e00ffff,
                nonce: 0,
                prev_hash: [0u8; 32],
            }])
            .unwrap();
        let service = HeaderSyncService::new(HeaderSyncConfig::default(), store);
        assert!(service.validate_merkle_root(&[9u8; 32], 1).await.unwrap());
        assert!(!service.validate_merkle_root(&[8u8; 32], 1).await.unwrap());
    }
}
