//! ClawMiner Wallet
//!
//! Secp256k1 key lifecycle for the daemon's reward-attribution identity:
//! load from a WIF-encoded secret, autogenerate, derive a mainnet P2PKH
//! address, and sign digests for settlement broadcasts.

pub mod base58check;
pub mod error;

use ripemd::Ripemd160;
use secp256k1::{ecdsa::Signature, rand, Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};

pub use error::{Error, Result};

const WIF_VERSION_MAINNET: u8 = 0x80;
const ADDRESS_VERSION_MAINNET: u8 = 0x00;
/// Appended to the WIF payload to signal the derived public key is compressed.
const WIF_COMPRESSED_FLAG: u8 = 0x01;

/// Returns the SHA256d (`SHA256(SHA256(x))`) digest of `data`.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let ripe = Ripemd160::digest(sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripe);
    out
}

/// A secp256k1 keypair plus its derived mainnet P2PKH address.
#[derive(Clone)]
pub struct Wallet {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl Wallet {
    /// Generates a fresh random keypair.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut rand::thread_rng());
        Self { secret_key, public_key }
    }

    /// Loads a wallet from a Base58Check WIF-encoded secret key.
    pub fn load(wif: &str) -> Result<Self> {
        let payload = base58check::decode(wif)?;
        if payload.is_empty() || payload[0] != WIF_VERSION_MAINNET {
            return Err(Error::InvalidKey("unexpected WIF version byte".into()));
        }
        let key_bytes = match payload.len() {
            // version + 32-byte key + compressed flag
            34 if payload[33] == WIF_COMPRESSED_FLAG => &payload[1..33],
            // version + 32-byte key, uncompressed
            33 => &payload[1..33],
            _ => return Err(Error::InvalidKey("unexpected WIF payload length".into())),
        };
        let secret_key = SecretKey::from_slice(key_bytes)?;
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Ok(Self { secret_key, public_key })
    }

    /// Encodes this wallet's secret key as Base58Check WIF (compressed).
    pub fn wif(&self) -> String {
        let mut payload = Vec::with_capacity(34);
        payload.push(WIF_VERSION_MAINNET);
        payload.extend_from_slice(&self.secret_key.secret_bytes());
        payload.push(WIF_COMPRESSED_FLAG);
        base58check::encode(&payload)
    }

    /// Derives the mainnet P2PKH address: `base58check(0x00 || hash160(pubkey))`.
    pub fn address(&self) -> String {
        let mut payload = Vec::with_capacity(21);
        payload.push(ADDRESS_VERSION_MAINNET);
        payload.extend_from_slice(&hash160(&self.public_key.serialize()));
        base58check::encode(&payload)
    }

    /// Signs `bytes` by first hashing with SHA256d, returning a DER-encoded
    /// ECDSA signature.
    pub fn sign(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.sign_hash(&sha256d(bytes))
    }

    /// Signs a pre-computed 32-byte digest directly, returning a DER-encoded
    /// ECDSA signature.
    pub fn sign_hash(&self, digest: &[u8; 32]) -> Result<Vec<u8>> {
        let secp = Secp256k1::new();
        let message = Message::from_digest(*digest);
        let sig: Signature = secp.sign_ecdsa(&message, &self.secret_key);
        Ok(sig.serialize_der().to_vec())
    }

    /// Verifies a DER-encoded ECDSA signature over `bytes` (hashed with
    /// SHA256d) against this wallet's own public key. Useful for tests and
    /// for peers re-verifying a gossiped signature given only the raw
    /// compressed public key bytes (see [`verify_with_pubkey`]).
    pub fn verify(&self, bytes: &[u8], der_sig: &[u8]) -> bool {
        verify_with_pubkey(&self.public_key.serialize(), bytes, der_sig)
    }
}

/// Verifies a DER-encoded ECDSA signature over `bytes` (hashed with
/// SHA256d) against a raw compressed public key, without needing a live
/// [`Wallet`]. Used by the network crate to validate gossip envelope
/// signatures from peers.
pub fn verify_with_pubkey(compressed_pubkey: &[u8; 33], bytes: &[u8], der_sig: &[u8]) -> bool {
    let Ok(pubkey) = PublicKey::from_slice(compressed_pubkey) else {
        return false;
    };
    let Ok(sig) = Signature::from_der(der_sig) else {
        return false;
    };
    let message = Message::from_digest(sha256d(bytes));
    let secp = Secp256k1::new();
    secp.verify_ecdsa(&message, &sig, &pubkey).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_round_trips_through_wif() {
        let wallet = Wallet::generate();
        let wif = wallet.wif();
        let loaded = Wallet::load(&wif).unwrap();
        assert_eq!(loaded.address(), wallet.address());
    }

    #[test]
    fn sign_produces_der_marker() {
        let wallet = Wallet::generate();
        let sig = wallet.sign(b"hello world").unwrap();
        // DER sequence tag
        assert_eq!(sig[0], 0x30);
    }

    #[test]
    fn signature_verifies_against_own_address() {
        let wallet = Wallet::generate();
        let sig = wallet.sign(b"block-commitment").unwrap();
        assert!(wallet.verify(b"block-commitment", &sig));
        assert!(!wallet.verify(b"tampered", &sig));
    }

    #[test]
    fn address_is_stable_across_clones() {
        let wallet = Wallet::generate();
        let clone = wallet.clone();
        assert_eq!(wallet.address(), clone.address());
    }

    #[test]
    fn rejects_bad_wif_version_byte() {
        let payload = vec![0x6f, 1, 2, 3]; // testnet-style version byte, wrong length too
        let bogus = base58check::encode(&payload);
        assert!(Wallet::load(&bogus).is_err());
    }
}
