//! Gossip identity: a long-lived Ed25519 keypair. The node never rotates
//! it across restarts; persistence is the caller's responsibility (the
//! daemon stores the raw marshalled bytes under `libp2p_identity_key` in
//! the config KV).

use libp2p::identity::Keypair;

use crate::error::{Error, Result};

/// Loads an identity from previously-persisted raw protobuf bytes, or
/// generates a fresh one. Returns the keypair plus the bytes the caller
/// should persist if none were supplied (a no-op if `existing` was `Some`).
pub fn load_or_generate(existing: Option<&[u8]>) -> Result<(Keypair, Vec<u8>)> {
    match existing {
        Some(bytes) => {
            let keypair =
                Keypair::from_protobuf_encoding(bytes).map_err(|e| Error::BadIdentity(e.to_string()))?;
            Ok((keypair, bytes.to_vec()))
        }
        None => {
            let keypair = Keypair::generate_ed25519();
            let bytes = keypair
                .to_protobuf_encoding()
                .map_err(|e| Error::BadIdentity(e.to_string()))?;
            Ok((keypair, bytes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_fresh_identity_when_none_persisted() {
        let (keypair, bytes) = load_or_generate(None).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(keypair.public().to_peer_id().to_bytes().len() > 0, true);
    }

    #[test]
    fn reloading_persisted_bytes_restores_same_peer_id() {
        let (first, bytes) = load_or_generate(None).unwrap();
        let (second, _) = load_or_generate(Some(&bytes)).unwrap();
        assert_eq!(first.public().to_peer_id(), second.public().to_peer_id());
    }

    #[test]
    fn corrupt_bytes_are_rejected() {
        assert!(load_or_generate(Some(&[1, 2, 3])).is_err());
    }
}
