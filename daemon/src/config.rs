//! Layered daemon configuration: one `AppConfig` aggregating every
//! subsystem's config, loadable from an optional TOML file with
//! environment-variable overrides for secrets.

use std::path::PathBuf;

use clawminer_core::config::MiningConfig;
use clawminer_headersync::HeaderSyncConfig;
use clawminer_mining::{BroadcasterKind, MiningServiceConfig};
use clawminer_network::GossipConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub http_addr: std::net::SocketAddr,
    pub wallet_wif: Option<String>,
    /// Overrides the wallet's derived address for reward attribution while
    /// the wallet's key still signs settlement broadcasts.
    pub reward_address: Option<String>,
    pub node_id: Option<String>,
    #[serde(default)]
    pub mining: MiningConfig,
    #[serde(default)]
    pub broadcaster: BroadcasterKind,
    #[serde(default)]
    pub gossip: GossipConfig,
    #[serde(default)]
    pub header_sync: HeaderSyncConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./clawminer-data"),
            http_addr: "127.0.0.1:8080".parse().expect("valid default socket addr"),
            wallet_wif: None,
            reward_address: None,
            node_id: None,
            mining: MiningConfig::default(),
            broadcaster: BroadcasterKind::default(),
            gossip: GossipConfig::default(),
            header_sync: HeaderSyncConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads a TOML config file if `path` is given, falling back to
    /// defaults, then applies environment-variable overrides for the two
    /// secrets that should never live in a checked-in file: the wallet WIF
    /// and the BHS API key.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
                    path: path.display().to_string(),
                    source: e,
                })?;
                toml::from_str(&raw).map_err(|e| Error::ConfigParse {
                    path: path.display().to_string(),
                    source: e,
                })?
            }
            None => AppConfig::default(),
        };

        if let Ok(wif) = std::env::var("CLAWMINER_WALLET_WIF") {
            config.wallet_wif = Some(wif);
        }
        if let Ok(api_key) = std::env::var("CLAWMINER_BHS_API_KEY") {
            config.header_sync.api_key = Some(api_key);
        }

        Ok(config)
    }

    pub fn mining_service_config(&self) -> MiningServiceConfig {
        MiningServiceConfig {
            core: self.mining.clone(),
            enabled_at_boot: true,
            broadcaster: self.broadcaster.clone(),
            nonce_quantum: 200_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_fallbacks() {
        let config = AppConfig::default();
        assert_eq!(config.http_addr.port(), 8080);
        assert!(config.wallet_wif.is_none());
    }

    #[test]
    fn load_with_no_path_falls_back_to_default() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./clawminer-data"));
    }

    #[test]
    fn load_from_toml_file_overrides_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            data_dir = "/tmp/clawminer-test"
            http_addr = "0.0.0.0:9090"
            "#,
        )
        .unwrap();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/clawminer-test"));
        assert_eq!(config.http_addr.port(), 9090);
    }
}
