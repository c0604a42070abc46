//! PoI block persistence: idempotent upsert by hash, tip/count queries.

use clawminer_core::{Block, Hash};
use rusqlite::{params, OptionalExtension};

use crate::error::{Error, Result};
use crate::types::{BlockCounts, StoredBlock};
use crate::Store;

fn row_to_stored(row: &rusqlite::Row) -> rusqlite::Result<StoredBlock> {
    let items_json: String = row.get("items_json")?;
    let items = serde_json::from_str(&items_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let hash_hex: String = row.get("hash")?;
    let prev_hash_hex: String = row.get("prev_hash")?;
    let merkle_root_hex: String = row.get("merkle_root")?;
    let hash = decode_hash(&hash_hex)?;
    let prev_hash = decode_hash(&prev_hash_hex)?;
    let merkle_root = decode_hash(&merkle_root_hex)?;
    let source_peer: Option<String> = row.get("source_peer")?;

    Ok(StoredBlock {
        block: Block {
            header: clawminer_core::BlockHeader {
                version: row.get("version")?,
                prev_hash,
                merkle_root,
                timestamp: row.get::<_, i64>("timestamp_ms")? as u64,
                bits: row.get::<_, i64>("bits")? as u32,
                nonce: row.get::<_, i64>("nonce")? as u64,
                miner_address: row.get("miner_address")?,
            },
            items,
        },
        hash,
        height: row.get::<_, i64>("height")? as u64,
        is_own: row.get::<_, i64>("is_own")? != 0,
        source_peer,
        item_count: row.get::<_, i64>("item_count")? as u64,
    })
}

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

impl Store {
    /// Inserts or replaces a block row keyed by its hash (idempotent
    /// upsert). `height` and `is_own`/`source_peer` are storage-assigned
    /// provenance, not part of the in-memory `Block`.
    pub fn insert_block(
        &self,
        block: &Block,
        height: u64,
        is_own: bool,
        source_peer: Option<&str>,
    ) -> Result<()> {
        let hash = block.hash();
        let items_json = serde_json::to_string(&block.items).map_err(|e| Error::Serialize(e.to_string()))?;
        let conn = self.writer();
        conn.execute(
            "INSERT INTO blocks (hash, height, version, prev_hash, merkle_root, timestamp_ms, bits, nonce, miner_address, item_count, items_json, is_own, source_peer)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(hash) DO UPDATE SET
                height = excluded.height,
                is_own = excluded.is_own,
                source_peer = excluded.source_peer",
            params![
                hex::encode(hash),
                height as i64,
                block.header.version,
                hex::encode(block.header.prev_hash),
                hex::encode(block.header.merkle_root),
                block.header.timestamp as i64,
                block.header.bits as i64,
                block.header.nonce as i64,
                block.header.miner_address,
                block.items.len() as i64,
                items_json,
                is_own as i64,
                source_peer,
            ],
        )?;
        Ok(())
    }

    /// Inserts a block announced by a peer, for which only the header and
    /// a claimed item count are known (the full item list is never part
    /// of a `BLOCK_ANNOUNCE` payload). `items_json` is stored as an empty
    /// array; `item_count` carries the claim as reported.
    pub fn insert_peer_block_announcement(
        &self,
        header: &clawminer_core::BlockHeader,
        hash: &Hash,
        height: u64,
        item_count: u64,
        source_peer: &str,
    ) -> Result<()> {
        let conn = self.writer();
        conn.execute(
            "INSERT INTO blocks (hash, height, version, prev_hash, merkle_root, timestamp_ms, bits, nonce, miner_address, item_count, items_json, is_own, source_peer)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, '[]', 0, ?11)
             ON CONFLICT(hash) DO UPDATE SET
                height = excluded.height,
                source_peer = excluded.source_peer",
            params![
                hex::encode(hash),
                height as i64,
                header.version,
                hex::encode(header.prev_hash),
                hex::encode(header.merkle_root),
                header.timestamp as i64,
                header.bits as i64,
                header.nonce as i64,
                header.miner_address,
                item_count as i64,
                source_peer,
            ],
        )?;
        Ok(())
    }

    pub fn get_block_by_hash(&self, hash: &Hash) -> Result<Option<StoredBlock>> {
        let conn = self.reader()?;
        conn.query_row(
            "SELECT * FROM blocks WHERE hash = ?1",
            params![hex::encode(hash)],
            row_to_stored,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Lists blocks descending by height.
    pub fn list_blocks(&self, limit: u64, offset: u64) -> Result<Vec<StoredBlock>> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM blocks ORDER BY height DESC LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt
            .query_map(params![limit as i64, offset as i64], row_to_stored)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn block_counts(&self) -> Result<BlockCounts> {
        let conn = self.reader()?;
        let own: i64 = conn.query_row(
            "SELECT COUNT(*) FROM blocks WHERE is_own = 1",
            [],
            |r| r.get(0),
        )?;
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM blocks", [], |r| r.get(0))?;
        Ok(BlockCounts {
            own: own as u64,
            total: total as u64,
        })
    }

    /// The highest-height accepted block, regardless of provenance (own or
    /// peer). Tip selection is "highest claimed height wins"; there is no
    /// fork-choice reconciliation between competing chains at equal height
    /// (see DESIGN.md).
    pub fn tip(&self) -> Result<Option<(u64, Hash)>> {
        let conn = self.reader()?;
        conn.query_row(
            "SELECT height, hash FROM blocks ORDER BY height DESC LIMIT 1",
            [],
            |row| {
                let height: i64 = row.get(0)?;
                let hash_hex: String = row.get(1)?;
                Ok((height, hash_hex))
            },
        )
        .optional()?
        .map(|(height, hash_hex)| {
            decode_hash(&hash_hex)
                .map(|h| (height as u64, h))
                .map_err(Error::from)
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawminer_core::{Block, WorkItem, WorkItemType};

    fn sample_block() -> Block {
        let item = WorkItem::new(WorkItemType::ContentServed, vec![1], 1);
        Block::assemble(1, [0u8; 32], vec![item], 1000, 0x1e00ffff, "addr".into())
    }

    fn open_tmp() -> (Store, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (Store::open(dir.path()).unwrap(), dir)
    }

    #[test]
    fn insert_and_fetch_round_trips() {
        let (store, _dir) = open_tmp();
        let block = sample_block();
        store.insert_block(&block, 1, true, None).unwrap();
        let fetched = store.get_block_by_hash(&block.hash()).unwrap().unwrap();
        assert_eq!(fetched.height, 1);
        assert!(fetched.is_own);
        assert_eq!(fetched.block.items.len(), 1);
    }

    #[test]
    fn insert_is_idempotent_on_hash() {
        let (store, _dir) = open_tmp();
        let block = sample_block();
        store.insert_block(&block, 1, true, None).unwrap();
        store.insert_block(&block, 1, true, None).unwrap();
        let counts = store.block_counts().unwrap();
        assert_eq!(counts.total, 1);
    }

    #[test]
    fn peer_announcement_stores_header_only() {
        let (store, _dir) = open_tmp();
        let block = sample_block();
        let hash = block.hash();
        store
            .insert_peer_block_announcement(&block.header, &hash, 5, 3, "peer-1")
            .unwrap();
        let fetched = store.get_block_by_hash(&hash).unwrap().unwrap();
        assert_eq!(fetched.height, 5);
        assert!(!fetched.is_own);
        assert_eq!(fetched.source_peer.as_deref(), Some("peer-1"));
        assert!(fetched.block.items.is_empty());
        assert_eq!(fetched.item_count, 3);
    }

    #[test]
    fn counts_and_tip_reflect_inserts() {
        let (store, _dir) = open_tmp();
        let own = sample_block();
        store.insert_block(&own, 1, true, None).unwrap();

        let item2 = clawminer_core::WorkItem::new(clawminer_core::WorkItemType::PeerRelayed, vec![2], 2);
        let peer_block = Block::assemble(1, own.hash(), vec![item2], 2000, 0x1e00ffff, "peer-addr".into());
        store.insert_block(&peer_block, 2, false, Some("peer-1")).unwrap();

        let counts = store.block_counts().unwrap();
        assert_eq!(counts.own, 1);
        assert_eq!(counts.total, 2);

        let (tip_height, tip_hash) = store.tip().unwrap().unwrap();
        assert_eq!(tip_height, 2);
        assert_eq!(tip_hash, peer_block.hash());
    }
}
