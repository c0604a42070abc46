//! Base58Check encode/decode, shared by WIF private-key and P2PKH address
//! formatting.

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

fn checksum(payload: &[u8]) -> [u8; 4] {
    let once = Sha256::digest(payload);
    let twice = Sha256::digest(once);
    let mut out = [0u8; 4];
    out.copy_from_slice(&twice[..4]);
    out
}

/// Encodes `payload` (already prefixed with its version byte) as
/// Base58Check: `base58(payload || checksum(payload))`.
pub fn encode(payload: &[u8]) -> String {
    let mut buf = payload.to_vec();
    buf.extend_from_slice(&checksum(payload));
    bs58::encode(buf).into_string()
}

/// Decodes a Base58Check string, verifying the trailing 4-byte checksum and
/// returning the payload (version byte included) without it.
pub fn decode(s: &str) -> Result<Vec<u8>> {
    let raw = bs58::decode(s)
        .into_vec()
        .map_err(|e| Error::InvalidKey(e.to_string()))?;
    if raw.len() < 4 {
        return Err(Error::InvalidKey("too short".into()));
    }
    let (payload, sum) = raw.split_at(raw.len() - 4);
    if checksum(payload) != sum {
        return Err(Error::BadChecksum);
    }
    Ok(payload.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let payload = vec![0x80, 1, 2, 3, 4];
        let encoded = encode(&payload);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn rejects_corrupted_checksum() {
        let payload = vec![0x80, 1, 2, 3, 4];
        let mut encoded = encode(&payload);
        encoded.push('Z');
        assert!(decode(&encoded).is_err());
    }
}
