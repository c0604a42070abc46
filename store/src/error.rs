//! Error types for the **ClawMiner** store crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open store at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("content store io error: {0}")]
    ContentIo(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
