//! Error types for the **ClawMiner** gossip network crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid gossip identity key: {0}")]
    BadIdentity(String),

    #[error("transport setup failed: {0}")]
    Transport(String),

    #[error("listen failed on {addr}: {source}")]
    Listen {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("gossipsub subscribe/publish failed: {0}")]
    PubSub(String),

    #[error("malformed envelope: {0}")]
    ProtocolViolation(String),

    #[error("envelope signature invalid")]
    ValidationReject,

    #[error("dial to {addr} failed: {source}")]
    Dial {
        addr: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type Result<T> = core::result::Result<T, Error>;
