//! ClawMiner Store
//!
//! Embedded transactional persistence: SQLite in WAL mode with foreign
//! keys enforced, one writer connection guarded by a mutex and a pooled set
//! of read-only connections (WAL allows readers to proceed concurrently
//! with the single writer). Holds PoI blocks, SPV headers, peer records,
//! and the runtime config KV. Content-addressed blobs live beside the
//! database as `content/<first2hex>/<fullhex>` files rather than in a
//! table.

mod blocks;
mod config_kv;
mod content;
pub mod error;
mod headers;
mod peers;
mod schema;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::info;

pub use error::{Error, Result};
pub use types::{BlockCounts, PeerRecord, StoredBlock, StoredHeader};

/// Single process-wide persistence handle. Cheap to clone (wraps `Arc`-like
/// pooled/mutex-guarded connections internally via `r2d2::Pool`, itself an
/// `Arc`), so subsystems can each hold their own `Store` value.
#[derive(Clone)]
pub struct Store {
    writer: std::sync::Arc<Mutex<Connection>>,
    readers: Pool<SqliteConnectionManager>,
    content_root: PathBuf,
}

impl Store {
    /// Opens (creating if absent) `clawminer.db` under `data_dir`, enables
    /// WAL journaling and foreign keys, and runs the schema migration.
    /// Open failure is fatal to the caller.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("clawminer.db");
        let content_root = data_dir.join("content");
        std::fs::create_dir_all(&content_root)?;

        let writer = Connection::open(&db_path).map_err(|e| Error::Open {
            path: db_path.display().to_string(),
            source: e,
        })?;
        configure_connection(&writer)?;
        writer.execute_batch(schema::SCHEMA_SQL)?;

        let manager = SqliteConnectionManager::file(&db_path).with_init(|conn| configure_connection(conn));
        let readers = Pool::builder()
            .max_size(8)
            .build(manager)
            .map_err(Error::Pool)?;

        info!(path = %db_path.display(), "store opened");
        Ok(Self {
            writer: std::sync::Arc::new(Mutex::new(writer)),
            readers,
            content_root,
        })
    }

    fn writer(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.writer.lock().expect("store writer mutex poisoned")
    }

    fn reader(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.readers.get()?)
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_tmp() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn opens_and_creates_schema() {
        let (_store, _dir) = open_tmp();
    }

    #[test]
    fn content_dir_created() {
        let (_store, dir) = open_tmp();
        assert!(dir.path().join("content").is_dir());
    }
}
