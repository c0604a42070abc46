//! Error types for the **ClawMiner** daemon orchestrator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open persistent store: {0}")]
    Store(#[from] clawminer_store::Error),

    #[error("failed to start gossip node: {0}")]
    Network(#[from] clawminer_network::Error),

    #[error("failed to bootstrap mining service: {0}")]
    Mining(#[from] clawminer_mining::Error),

    #[error("wallet error: {0}")]
    Wallet(#[from] clawminer_wallet::Error),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("http api error: {0}")]
    Api(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
