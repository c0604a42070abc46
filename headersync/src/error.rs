//! Error types for the **ClawMiner** header-sync crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("block headers service request failed: {0}")]
    NetworkTransient(#[from] reqwest::Error),

    #[error("store error: {0}")]
    Store(#[from] clawminer_store::Error),

    #[error("block headers service returned malformed data: {0}")]
    ProtocolViolation(String),
}

pub type Result<T> = core::result::Result<T, Error>;
