//! Deterministic merkle root over a sorted set of 32-byte work-item ids.
//!
//! Each level hashes leaves pairwise with a single SHA-256 (not the
//! double-SHA256 used for block identity); odd levels duplicate the final
//! hash before pairing, matching the source's duplicate-last-leaf rule bit
//! for bit.

use sha2::{Digest, Sha256};

use crate::Hash;

fn sha256(data: &[u8]) -> Hash {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Computes the merkle root of `ids`, which must already be sorted.
///
/// Returns the all-zero hash for an empty input (an empty block body).
pub fn merkle_root(ids: &[Hash]) -> Hash {
    if ids.is_empty() {
        return [0u8; 32];
    }

    let mut level: Vec<Hash> = ids.iter().map(|id| sha256(id)).collect();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = *level.last().unwrap();
            level.push(last);
        }
        level = level
            .chunks(2)
            .map(|pair| {
                let mut buf = Vec::with_capacity(64);
                buf.extend_from_slice(&pair[0]);
                buf.extend_from_slice(&pair[1]);
                sha256(&buf)
            })
            .collect();
    }
    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_leaf_is_its_own_hash() {
        let mut id = [0u8; 32];
        id[31] = 1;
        let root = merkle_root(&[id]);
        assert_eq!(root, sha256(&id));
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(merkle_root(&[]), [0u8; 32]);
    }

    #[test]
    fn odd_count_duplicates_last() {
        let ids = [[1u8; 32], [2u8; 32], [3u8; 32]];
        let leaves: Vec<Hash> = ids.iter().map(|id| sha256(id)).collect();
        let mut padded = leaves.clone();
        padded.push(leaves[2]);
        let mut expected_level = Vec::new();
        for pair in padded.chunks(2) {
            let mut buf = Vec::new();
            buf.extend_from_slice(&pair[0]);
            buf.extend_from_slice(&pair[1]);
            expected_level.push(sha256(&buf));
        }
        let expected = sha256(
            &[expected_level[0], expected_level[1]]
                .concat(),
        );
        assert_eq!(merkle_root(&ids), expected);
    }

    #[test]
    fn order_matters() {
        let a = [[1u8; 32], [2u8; 32]];
        let b = [[2u8; 32], [1u8; 32]];
        assert_ne!(merkle_root(&a), merkle_root(&b));
    }
}
