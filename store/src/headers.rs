//! SPV header persistence: idempotent batch insert keyed by height, plus
//! the merkle-root lookup PoI blocks are validated against.

use clawminer_core::Hash;
use rusqlite::{params, OptionalExtension};

use crate::error::Result;
use crate::types::StoredHeader;
use crate::Store;

fn decode_hash(hex_str: &str) -> rusqlite::Result<Hash> {
    let bytes = hex::decode(hex_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let mut out = [0u8; 32];
    if bytes.len() != 32 {
        return Err(rusqlite::Error::InvalidColumnType(
            0,
            "hash".into(),
            rusqlite::types::Type::Text,
        ));
    }
    out.copy_from_slice(&bytes);
    Ok(out)
}

fn row_to_header(row: &rusqlite::Row) -> rusqlite::Result<StoredHeader> {
    let hash_hex: String = row.get("hash")?;
    let merkle_root_hex: String = row.get("merkle_root")?;
    let prev_hash_hex: String = row.get("prev_hash")?;
    Ok(StoredHeader {
        height: row.get::<_, i64>("height")? as u64,
        hash: decode_hash(&hash_hex)?,
        version: row.get("version")?,
        merkle_root: decode_hash(&merkle_root_hex)?,
        timestamp_ms: row.get::<_, i64>("timestamp_ms")? as u64,
        bits: row.get::<_, i64>("bits")? as u32,
        nonce: row.get::<_, i64>("nonce")? as u64,
        prev_hash: decode_hash(&prev_hash_hex)?,
    })
}

impl Store {
    /// Inserts a batch of headers, replacing any existing row at the same
    /// height. Header sync re-fetches overlapping ranges on retry, so this
    /// must be idempotent.
    pub fn insert_headers_batch(&self, headers: &[StoredHeader]) -> Result<()> {
        let mut conn = self.writer();
        let tx = conn.transaction()?;
        for h in headers {
            tx.execute(
                "INSERT INTO headers (height, hash, version, merkle_root, timestamp_ms, bits, nonce, prev_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(height) DO UPDATE SET
                    hash = excluded.hash,
                    version = excluded.version,
                    merkle_root = excluded.merkle_root,
                    timestamp_ms = excluded.timestamp_ms,
                    bits = excluded.bits,
                    nonce = excluded.nonce,
                    prev_hash = excluded.prev_hash",
                params![
                    h.height as i64,
                    hex::encode(h.hash),
                    h.version,
                    hex::encode(h.merkle_root),
                    h.timestamp_ms as i64,
                    h.bits as i64,
                    h.nonce as i64,
                    hex::encode(h.prev_hash),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_header(&self, height: u64) -> Result<Option<StoredHeader>> {
        let conn = self.reader()?;
        conn.query_row(
            "SELECT * FROM headers WHERE height = ?1",
            params![height as i64],
            row_to_header,
        )
        .optional()
        .map_err(crate::Error::from)
    }

    pub fn highest_header_height(&self) -> Result<Option<u64>> {
        let conn = self.reader()?;
        let height: Option<i64> = conn
            .query_row("SELECT MAX(height) FROM headers", [], |r| r.get(0))
            .optional()?
            .flatten();
        Ok(height.map(|h| h as u64))
    }

    /// True if a header at `height` carries `merkle_root` — the check a
    /// mined block's merkle root is validated against before settlement.
    pub fn has_merkle_root(&self, merkle_root: &Hash, height: u64) -> Result<bool> {
        let conn = self.reader()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM headers WHERE merkle_root = ?1 AND height = ?2",
            params![hex::encode(merkle_root), height as i64],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_tmp() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (Store::open(dir.path()).unwrap(), dir)
    }

    fn sample(height: u64, root: u8) -> StoredHeader {
        StoredHeader {
            height,
            hash: [height as u8; 32],
            version: 1,
            merkle_root: [root; 32],
            timestamp_ms: 1000 + height,
            bits: 0x1e00ffff,
            nonce: 0,
            prev_hash: [0u8; 32],
        }
    }

    #[test]
    fn batch_insert_then_lookup() {
        let (store, _dir) = open_tmp();
        store.insert_headers_batch(&[sample(1, 9), sample(2, 8)]).unwrap();
        assert_eq!(store.highest_header_height().unwrap(), Some(2));
        assert!(store.has_merkle_root(&[9u8; 32], 1).unwrap());
        assert!(!store.has_merkle_root(&[9u8; 32], 2).unwrap());
    }

    #[test]
    fn re_insert_at_same_height_overwrites() {
        let (store, _dir) = open_tmp();
        store.insert_headers_batch(&[sample(1, 9)]).unwrap();
        store.insert_headers_batch(&[sample(1, 7)]).unwrap();
        let header = store.get_header(1).unwrap().unwrap();
        assert_eq!(header.merkle_root, [7u8; 32]);
    }

    #[test]
    fn empty_store_has_no_highest_height() {
        let (store, _dir) = open_tmp();
        assert_eq!(store.highest_header_height().unwrap(), None);
    }
}
