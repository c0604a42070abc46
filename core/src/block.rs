//! PoI block header/body structure and the assembly rules in §3/§4.5 of the
//! spec: a block commits to a merkle root of sorted work-item ids and must
//! satisfy the difficulty target encoded in its `bits` field.

use serde::{Deserialize, Serialize};

use crate::merkle::merkle_root;
use crate::pow::calculate_block_hash;
use crate::work_item::WorkItem;
use crate::Hash;

/// All-zero hash standing in for "no previous block" at genesis.
pub const GENESIS_PREV_HASH: Hash = [0u8; 32];

/// The portion of a block that is hashed for proof-of-work and block
/// identity. Changing any field produces a completely different hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub prev_hash: Hash,
    pub merkle_root: Hash,
    /// Milliseconds since Unix epoch.
    pub timestamp: u64,
    /// Compact difficulty target encoding.
    pub bits: u32,
    pub nonce: u64,
    pub miner_address: String,
}

impl BlockHeader {
    /// Deterministic byte encoding used as the proof-of-work input. Fields
    /// are written in a fixed order with explicit widths so the encoding
    /// never depends on struct layout or a serialization library's
    /// internal format evolving out from under consensus.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32 + 32 + 32 + 8 + 4 + 8 + 4 + self.miner_address.len());
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.prev_hash);
        buf.extend_from_slice(&self.merkle_root);
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&self.bits.to_le_bytes());
        buf.extend_from_slice(&self.nonce.to_le_bytes());
        let addr_bytes = self.miner_address.as_bytes();
        buf.extend_from_slice(&(addr_bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(addr_bytes);
        buf
    }
}

/// A mined or received block: a header plus the ordered work items it
/// commits to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub items: Vec<WorkItem>,
}

impl Block {
    /// Assembles a new, unmined block from already-sorted `items`. `nonce`
    /// starts at 0; callers search for a valid nonce separately (see the
    /// `clawminer-mining` crate's worker loop) so mining can be interrupted
    /// at a quantum boundary.
    pub fn assemble(
        version: u32,
        prev_hash: Hash,
        items: Vec<WorkItem>,
        timestamp: u64,
        bits: u32,
        miner_address: String,
    ) -> Self {
        let ids: Vec<Hash> = items.iter().map(|i| i.id).collect();
        let header = BlockHeader {
            version,
            prev_hash,
            merkle_root: merkle_root(&ids),
            timestamp,
            bits,
            nonce: 0,
            miner_address,
        };
        Self { header, items }
    }

    /// The block's identity hash: `SHA256d` of the header's canonical bytes.
    pub fn hash(&self) -> Hash {
        calculate_block_hash(&self.header)
    }

    /// Recomputes the merkle root over this block's own items and compares
    /// it against the header's claimed root.
    pub fn merkle_root_matches(&self) -> bool {
        let ids: Vec<Hash> = self.items.iter().map(|i| i.id).collect();
        merkle_root(&ids) == self.header.merkle_root
    }

    /// Lightweight structural + PoW validity check against an expected
    /// chain tip. Does not consult the difficulty adjuster or persistence.
    pub fn is_structurally_valid(&self, expected_prev: &Hash) -> bool {
        self.header.prev_hash == *expected_prev
            && self.merkle_root_matches()
            && crate::pow::check_difficulty(&self.hash(), self.header.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::{bits_from_target, target_from_bits};
    use crate::work_item::WorkItemType;
    use num_bigint::BigUint;
    use num_traits::One;

    fn max_difficulty_bits() -> u32 {
        bits_from_target(&((BigUint::one() << 256u32) - BigUint::one()))
    }

    #[test]
    fn assemble_sets_merkle_root_and_prev_hash() {
        let item = WorkItem::new(WorkItemType::PeerRelayed, vec![9], 1);
        let block = Block::assemble(
            1,
            GENESIS_PREV_HASH,
            vec![item],
            1000,
            max_difficulty_bits(),
            "addr".into(),
        );
        assert!(block.merkle_root_matches());
        assert_eq!(block.header.prev_hash, GENESIS_PREV_HASH);
    }

    #[test]
    fn canonical_bytes_change_with_nonce() {
        let item = WorkItem::new(WorkItemType::PeerRelayed, vec![9], 1);
        let mut block = Block::assemble(1, GENESIS_PREV_HASH, vec![item], 1000, 0x1f00ffff, "a".into());
        let h1 = block.hash();
        block.header.nonce += 1;
        let h2 = block.hash();
        assert_ne!(h1, h2);
    }

    #[test]
    fn structurally_valid_requires_matching_prev() {
        let item = WorkItem::new(WorkItemType::PeerRelayed, vec![9], 1);
        let block = Block::assemble(
            1,
            GENESIS_PREV_HASH,
            vec![item],
            1000,
            max_difficulty_bits(),
            "addr".into(),
        );
        assert!(block.is_structurally_valid(&GENESIS_PREV_HASH));
        assert!(!block.is_structurally_valid(&[9u8; 32]));
    }

    #[test]
    fn bits_low_difficulty_roundtrips_through_target() {
        let bits = max_difficulty_bits();
        let target = target_from_bits(bits);
        assert!(target > BigUint::from(0u32));
    }
}
