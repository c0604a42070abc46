//! Schema migration run once at store open. Scoped to the tables the
//! ClawMiner core actually reads and writes: PoI blocks, SPV headers,
//! peers, config KV, and content metadata. Token/holding/transfer ledger
//! tables belong to the token-economy overlay this daemon does not
//! implement — they are not created here so the schema has no dead
//! tables.

pub const SCHEMA_SQL: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS config (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS blocks (
    hash           TEXT PRIMARY KEY,
    height         INTEGER NOT NULL,
    version        INTEGER NOT NULL,
    prev_hash      TEXT NOT NULL,
    merkle_root    TEXT NOT NULL,
    timestamp_ms   INTEGER NOT NULL,
    bits           INTEGER NOT NULL,
    nonce          INTEGER NOT NULL,
    miner_address  TEXT NOT NULL,
    item_count     INTEGER NOT NULL,
    items_json     TEXT NOT NULL,
    is_own         INTEGER NOT NULL,
    source_peer    TEXT
);
CREATE INDEX IF NOT EXISTS idx_blocks_height ON blocks(height);
CREATE INDEX IF NOT EXISTS idx_blocks_is_own ON blocks(is_own);

CREATE TABLE IF NOT EXISTS headers (
    height       INTEGER PRIMARY KEY,
    hash         TEXT NOT NULL,
    version      INTEGER NOT NULL,
    merkle_root  TEXT NOT NULL,
    timestamp_ms INTEGER NOT NULL,
    bits         INTEGER NOT NULL,
    nonce        INTEGER NOT NULL,
    prev_hash    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_headers_root_height ON headers(merkle_root, height);

CREATE TABLE IF NOT EXISTS peers (
    peer_id            TEXT PRIMARY KEY,
    address            TEXT,
    reputation         INTEGER NOT NULL DEFAULT 50,
    valid_count        INTEGER NOT NULL DEFAULT 0,
    invalid_count      INTEGER NOT NULL DEFAULT 0,
    connection_failures INTEGER NOT NULL DEFAULT 0,
    status             TEXT NOT NULL DEFAULT 'active',
    discovery_source   TEXT NOT NULL DEFAULT 'unknown',
    last_seen_ms       INTEGER
);

CREATE TABLE IF NOT EXISTS content_metadata (
    hash       TEXT PRIMARY KEY,
    size_bytes INTEGER NOT NULL,
    stored_at_ms INTEGER NOT NULL
);
"#;
