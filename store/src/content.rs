//! Content-addressed blob storage on the filesystem, sharded by the first
//! byte of the SHA256 digest to keep any one directory small.

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::Store;

fn blob_path(content_root: &std::path::Path, hash_hex: &str) -> std::path::PathBuf {
    let shard = &hash_hex[0..2];
    content_root.join(shard).join(hash_hex)
}

impl Store {
    /// Writes `data` under its SHA256 digest, returning the hex digest.
    /// Writing the same bytes twice is a no-op past the first write
    /// (content address implies identical contents).
    pub fn put_content(&self, data: &[u8]) -> Result<String> {
        let digest = hex::encode(Sha256::digest(data));
        let path = blob_path(&self.content_root, &digest);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if !path.exists() {
            std::fs::write(&path, data)?;
        }

        let conn = self.writer();
        conn.execute(
            "INSERT INTO content_metadata (hash, size_bytes, stored_at_ms) VALUES (?1, ?2, ?3)
             ON CONFLICT(hash) DO NOTHING",
            rusqlite::params![digest, data.len() as i64, clawminer_core::now_ms() as i64],
        )?;
        Ok(digest)
    }

    pub fn get_content(&self, hash_hex: &str) -> Result<Option<Vec<u8>>> {
        let path = blob_path(&self.content_root, hash_hex);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn has_content(&self, hash_hex: &str) -> bool {
        blob_path(&self.content_root, hash_hex).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_tmp() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (Store::open(dir.path()).unwrap(), dir)
    }

    #[test]
    fn put_then_get_round_trips() {
        let (store, _dir) = open_tmp();
        let digest = store.put_content(b"hello clawminer").unwrap();
        assert!(store.has_content(&digest));
        let fetched = store.get_content(&digest).unwrap().unwrap();
        assert_eq!(fetched, b"hello clawminer");
    }

    #[test]
    fn missing_content_is_none() {
        let (store, _dir) = open_tmp();
        assert_eq!(store.get_content(&"00".repeat(32)).unwrap(), None);
    }

    #[test]
    fn sharded_by_first_two_hex_chars() {
        let (store, dir) = open_tmp();
        let digest = store.put_content(b"shard-me").unwrap();
        let expected = dir.path().join("content").join(&digest[0..2]).join(&digest);
        assert!(expected.is_file());
    }
}
