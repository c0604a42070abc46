//! Peer reputation bookkeeping.

use rusqlite::{params, OptionalExtension};

use crate::error::Result;
use crate::types::PeerRecord;
use crate::Store;

const REPUTATION_MIN: i64 = 0;
const REPUTATION_MAX: i64 = 100;

fn row_to_peer(row: &rusqlite::Row) -> rusqlite::Result<PeerRecord> {
    Ok(PeerRecord {
        peer_id: row.get("peer_id")?,
        address: row.get("address")?,
        reputation: row.get("reputation")?,
        valid_count: row.get("valid_count")?,
        invalid_count: row.get("invalid_count")?,
        connection_failures: row.get("connection_failures")?,
        status: row.get("status")?,
        discovery_source: row.get("discovery_source")?,
        last_seen_ms: row.get::<_, Option<i64>>("last_seen_ms")?.map(|v| v as u64),
    })
}

impl Store {
    /// Upserts a peer row, clamping its reputation to `[0, 100]`. Each
    /// observation applies a fixed +/-1 delta; reputation does not decay
    /// over time.
    pub fn upsert_peer_observation(
        &self,
        peer_id: &str,
        address: Option<&str>,
        reputation_delta: i64,
        valid: bool,
        discovery_source: &str,
        seen_at_ms: u64,
    ) -> Result<()> {
        let conn = self.writer();
        let valid_inc = if valid { 1 } else { 0 };
        let invalid_inc = if valid { 0 } else { 1 };
        conn.execute(
            "INSERT INTO peers (peer_id, address, reputation, valid_count, invalid_count, discovery_source, last_seen_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(peer_id) DO UPDATE SET
                address = COALESCE(excluded.address, peers.address),
                reputation = MAX(?8, MIN(?9, peers.reputation + ?10)),
                valid_count = peers.valid_count + ?4,
                invalid_count = peers.invalid_count + ?5,
                last_seen_ms = excluded.last_seen_ms",
            params![
                peer_id,
                address,
                (50 + reputation_delta).clamp(REPUTATION_MIN, REPUTATION_MAX),
                valid_inc,
                invalid_inc,
                discovery_source,
                seen_at_ms as i64,
                REPUTATION_MIN,
                REPUTATION_MAX,
                reputation_delta,
            ],
        )?;
        Ok(())
    }

    pub fn record_connection_failure(&self, peer_id: &str) -> Result<()> {
        let conn = self.writer();
        conn.execute(
            "UPDATE peers SET connection_failures = connection_failures + 1 WHERE peer_id = ?1",
            params![peer_id],
        )?;
        Ok(())
    }

    pub fn get_peer(&self, peer_id: &str) -> Result<Option<PeerRecord>> {
        let conn = self.reader()?;
        conn.query_row(
            "SELECT * FROM peers WHERE peer_id = ?1",
            params![peer_id],
            row_to_peer,
        )
        .optional()
        .map_err(crate::Error::from)
    }

    pub fn list_peers(&self) -> Result<Vec<PeerRecord>> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare("SELECT * FROM peers ORDER BY reputation DESC")?;
        let rows = stmt
            .query_map([], row_to_peer)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
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
    fn first_observation_seeds_default_reputation() {
        let (store, _dir) = open_tmp();
        store
            .upsert_peer_observation("peer-1", Some("/ip4/1.2.3.4"), 1, true, "bootstrap", 1000)
            .unwrap();
        let peer = store.get_peer("peer-1").unwrap().unwrap();
        assert_eq!(peer.reputation, 51);
        assert_eq!(peer.valid_count, 1);
    }

    #[test]
    fn reputation_clamps_at_bounds() {
        let (store, _dir) = open_tmp();
        store
            .upsert_peer_observation("peer-1", None, 1, true, "bootstrap", 1000)
            .unwrap();
        for _ in 0..200 {
            store
                .upsert_peer_observation("peer-1", None, 1, true, "bootstrap", 1000)
                .unwrap();
        }
        let peer = store.get_peer("peer-1").unwrap().unwrap();
        assert_eq!(peer.reputation, 100);
    }

    #[test]
    fn invalid_observation_decrements_and_counts() {
        let (store, _dir) = open_tmp();
        store
            .upsert_peer_observation("peer-1", None, 1, true, "bootstrap", 1000)
            .unwrap();
        store
            .upsert_peer_observation("peer-1", None, -1, false, "bootstrap", 2000)
            .unwrap();
        let peer = store.get_peer("peer-1").unwrap().unwrap();
        assert_eq!(peer.reputation, 50);
        assert_eq!(peer.invalid_count, 1);
    }

    #[test]
    fn connection_failure_increments_counter() {
        let (store, _dir) = open_tmp();
        store
            .upsert_peer_observation("peer-1", None, 0, true, "bootstrap", 1000)
            .unwrap();
        store.record_connection_failure("peer-1").unwrap();
        let peer = store.get_peer("peer-1").unwrap().unwrap();
        assert_eq!(peer.connection_failures, 1);
    }
}
