//! Error types for the **ClawMiner** wallet crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid WIF-encoded key: {0}")]
    InvalidKey(String),

    #[error("base58check checksum mismatch")]
    BadChecksum,

    #[error("secp256k1 error: {0}")]
    Secp256k1(#[from] secp256k1::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
