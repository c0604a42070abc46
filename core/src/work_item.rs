//! Work items: the gossiped units of indexing/serving/relay proof that feed
//! the mining mempool.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Hash;

/// Category of proof a work item represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkItemType {
    TxIndexed,
    ContentServed,
    StampValidated,
    PeerRelayed,
    MarketIndexed,
}

/// A single proof of work performed by the network, gossiped in and
/// accumulated in the mining mempool until it is drained into a block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    /// Content hash of `type | data | timestamp`; unique key within the mempool.
    pub id: Hash,
    pub item_type: WorkItemType,
    pub data: Vec<u8>,
    /// Milliseconds since Unix epoch.
    pub timestamp: u64,
}

impl WorkItem {
    /// Builds a work item and derives its id from the canonical fields.
    pub fn new(item_type: WorkItemType, data: Vec<u8>, timestamp: u64) -> Self {
        let id = Self::derive_id(item_type, &data, timestamp);
        Self {
            id,
            item_type,
            data,
            timestamp,
        }
    }

    fn derive_id(item_type: WorkItemType, data: &[u8], timestamp: u64) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update([item_type as u8]);
        hasher.update(data);
        hasher.update(timestamp.to_le_bytes());
        let digest = hasher.finalize();
        let mut id = [0u8; 32];
        id.copy_from_slice(&digest);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_deterministic() {
        let a = WorkItem::new(WorkItemType::ContentServed, vec![1, 2, 3], 1000);
        let b = WorkItem::new(WorkItemType::ContentServed, vec![1, 2, 3], 1000);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn id_changes_with_timestamp() {
        let a = WorkItem::new(WorkItemType::ContentServed, vec![1, 2, 3], 1000);
        let b = WorkItem::new(WorkItemType::ContentServed, vec![1, 2, 3], 1001);
        assert_ne!(a.id, b.id);
    }
}
