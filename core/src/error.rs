//! Error types for the **ClawMiner** core crate.
//!
//! All high-level operations return [`crate::Result`] which is a convenient
//! alias for `core::result::Result<T, Error>`.
//!
//! The enum is intentionally minimal and high-level. Lower-level errors are
//! mapped into one of these variants before bubbling up to callers.
//!
//! # Examples
//!
//! ```
//! use clawminer_core::{Error, Result};
//!
//! fn demo_fn(fail: bool) -> Result<()> {
//!     if fail {
//!         Err(Error::DifficultyFail)
//!     } else {
//!         Ok(())
//!     }
//! }
//! ```

use thiserror::Error;

/// Core crate error type.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// Block header hash does not satisfy the difficulty target.
    #[error("difficulty target not met")]
    DifficultyFail,

    /// `merkle_root` does not match the recomputed root of the block's items.
    #[error("merkle root mismatch")]
    MerkleMismatch,

    /// `prev_hash` field does not match the expected chain tip.
    #[error("block previous hash mismatch")]
    PrevHashMismatch,

    /// Mempool is at capacity; caller must evict or reject.
    #[error("mempool at capacity")]
    Capacity,

    /// Difficulty target arithmetic would cross below 1 or above the hash-space max.
    #[error("difficulty target out of bounds")]
    TargetOutOfBounds,

    /// A configuration value failed validation.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Placeholder for errors originating from external crates.
    #[error("{0}")]
    Other(&'static str),
}

/// Convenient result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
