//! Error types for the **ClawMiner** mining crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] clawminer_store::Error),

    #[error("core error: {0}")]
    Core(#[from] clawminer_core::Error),

    #[error("settlement broadcast failed: {0}")]
    NetworkTransient(String),

    #[error("peer block rejected: {0}")]
    ValidationReject(String),

    #[error("settlement queue is full, job dropped")]
    Capacity,
}

pub type Result<T> = core::result::Result<T, Error>;
