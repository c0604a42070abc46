//! Runtime config key/value table, used for small persisted daemon state
//! such as the difficulty adjuster snapshot and wallet metadata that isn't
//! sensitive enough to warrant its own table.

use rusqlite::{params, OptionalExtension};

use crate::error::Result;
use crate::Store;

impl Store {
    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let conn = self.reader()?;
        conn.query_row(
            "SELECT value FROM config WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(crate::Error::from)
    }

    pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.writer();
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Convenience wrapper storing a serde-serializable value as JSON.
    pub fn get_config_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_config(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| crate::Error::Serialize(e.to_string())),
            None => Ok(None),
        }
    }

    pub fn set_config_json<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value).map_err(|e| crate::Error::Serialize(e.to_string()))?;
        self.set_config(key, &raw)
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
    fn get_missing_key_is_none() {
        let (store, _dir) = open_tmp();
        assert_eq!(store.get_config("missing").unwrap(), None);
    }

    #[test]
    fn set_then_get_round_trips() {
        let (store, _dir) = open_tmp();
        store.set_config("wallet.address", "1abc").unwrap();
        assert_eq!(
            store.get_config("wallet.address").unwrap(),
            Some("1abc".to_string())
        );
    }

    #[test]
    fn set_overwrites_existing_value() {
        let (store, _dir) = open_tmp();
        store.set_config("k", "v1").unwrap();
        store.set_config("k", "v2").unwrap();
        assert_eq!(store.get_config("k").unwrap(), Some("v2".to_string()));
    }

    #[test]
    fn json_helpers_round_trip_struct() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Snapshot {
            total_blocks: u64,
        }
        let (store, _dir) = open_tmp();
        let snap = Snapshot { total_blocks: 42 };
        store.set_config_json("difficulty.state", &snap).unwrap();
        let loaded: Option<Snapshot> = store.get_config_json("difficulty.state").unwrap();
        assert_eq!(loaded, Some(snap));
    }
}
