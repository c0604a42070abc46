//! Proof-of-Work helpers: double-SHA256 hashing, compact difficulty
//! encoding, and the target comparison every accepted block must satisfy.
//!
//! All functions here are pure and stateless so they can be called from any
//! thread without synchronization.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use sha2::{Digest, Sha256};

use crate::block::BlockHeader;
use crate::Hash;

/// Returns the SHA256d (`SHA256(SHA256(x))`) digest of `data`.
pub fn sha256d(data: &[u8]) -> Hash {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

/// Computes the block identity hash: `SHA256d` of the header's canonical
/// byte encoding.
pub fn calculate_block_hash(header: &BlockHeader) -> Hash {
    let encoded = header.canonical_bytes();
    sha256d(&encoded)
}

/// Interprets `bytes` as a little-endian unsigned integer for difficulty
/// comparisons.
fn hash_as_uint_le(bytes: &Hash) -> BigUint {
    BigUint::from_bytes_le(bytes)
}

/// One past the largest 256-bit value; difficulty is expressed relative to
/// this ceiling.
fn hash_space_max() -> BigUint {
    BigUint::one() << 256u32
}

/// Unpacks a compact `bits` encoding (Bitcoin-style exponent+mantissa) into
/// the big-integer target a valid hash must fall strictly below.
pub fn target_from_bits(bits: u32) -> BigUint {
    let exponent = bits >> 24;
    let mantissa = BigUint::from(bits & 0x007f_ffff);
    if mantissa.is_zero() {
        return BigUint::zero();
    }
    if exponent <= 3 {
        mantissa >> (8 * (3 - exponent))
    } else {
        mantissa << (8 * (exponent - 3))
    }
}

/// Packs a big-integer target into the compact `bits` encoding, choosing the
/// smallest exponent that represents `target` without losing the top three
/// mantissa bytes.
pub fn bits_from_target(target: &BigUint) -> u32 {
    if target.is_zero() {
        return 0;
    }
    let bytes = target.to_bytes_be();
    let mut size = bytes.len() as u32;
    let mut mantissa_bytes = [0u8; 3];

    if size <= 3 {
        mantissa_bytes[(3 - size) as usize..].copy_from_slice(&bytes);
    } else {
        mantissa_bytes.copy_from_slice(&bytes[0..3]);
    }

    let mut mantissa = u32::from_be_bytes([0, mantissa_bytes[0], mantissa_bytes[1], mantissa_bytes[2]]);
    // avoid setting the sign bit (0x00800000), matching Bitcoin's compact rule
    if mantissa & 0x0080_0000 != 0 {
        mantissa >>= 8;
        size += 1;
    }
    (size << 24) | mantissa
}

/// Returns `true` if `hash`, read as a little-endian integer, is strictly
/// below the target encoded by `bits`.
pub fn check_difficulty(hash: &Hash, bits: u32) -> bool {
    let target = target_from_bits(bits);
    if target.is_zero() {
        return false;
    }
    hash_as_uint_le(hash) < target
}

/// Derives a "leading-zero-equivalent" difficulty integer for display:
/// `floor(log2(hash_space_max / target))`, approximated via bit length since
/// the quantity only needs to be monotonic and roughly comparable across
/// adjustments, not exact to the bit.
pub fn difficulty_from_target(target: &BigUint) -> u64 {
    if target.is_zero() {
        return 256;
    }
    let max_bits = hash_space_max().bits();
    let target_bits = target.bits();
    max_bits.saturating_sub(target_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_roundtrip_is_close() {
        let target = BigUint::from(0x00ffffu32) << (8 * 20);
        let bits = bits_from_target(&target);
        let back = target_from_bits(bits);
        // compact encoding is lossy in the low bytes only
        assert!(back <= target);
        assert!(&back + (BigUint::one() << (8 * 17)) > target);
    }

    #[test]
    fn zero_difficulty_bits_rejects_everything() {
        assert!(!check_difficulty(&[0u8; 32], 0));
    }

    #[test]
    fn max_target_accepts_near_zero_hash() {
        // exponent 32, mantissa 0x7fffff -> huge target
        let bits = (32u32 << 24) | 0x007f_ffff;
        assert!(check_difficulty(&[0u8; 32], bits));
    }

    #[test]
    fn difficulty_increases_as_target_shrinks() {
        let big_target = BigUint::one() << 250;
        let small_target = BigUint::one() << 100;
        assert!(difficulty_from_target(&small_target) > difficulty_from_target(&big_target));
    }

    #[test]
    fn hash_little_endian_interpretation() {
        let mut hash = [0u8; 32];
        hash[0] = 0x01; // smallest byte position -> least significant in LE
        let as_uint = hash_as_uint_le(&hash);
        assert_eq!(as_uint, BigUint::from(1u32));
    }
}
