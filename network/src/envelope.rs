//! Gossip wire envelope: the single message shape carried on the PoI
//! overlay's pub-sub topic, plus the two payload types the core spec
//! requires (`WORK_ITEM_OFFER`, `BLOCK_ANNOUNCE`). Unrecognised message
//! types deserialize into `MessageType::Other` and are handed to whatever
//! sink the caller registered for them, rather than rejected outright.

use clawminer_core::{Hash, WorkItemType};
use libp2p::identity::Keypair;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    WorkItemOffer,
    BlockAnnounce,
    Other(String),
}

impl MessageType {
    fn as_wire_str(&self) -> &str {
        match self {
            MessageType::WorkItemOffer => "WORK_ITEM_OFFER",
            MessageType::BlockAnnounce => "BLOCK_ANNOUNCE",
            MessageType::Other(s) => s.as_str(),
        }
    }

    fn from_wire_str(s: &str) -> Self {
        match s {
            "WORK_ITEM_OFFER" => MessageType::WorkItemOffer,
            "BLOCK_ANNOUNCE" => MessageType::BlockAnnounce,
            other => MessageType::Other(other.to_string()),
        }
    }
}

impl Serialize for MessageType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire_str())
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(MessageType::from_wire_str(&s))
    }
}

/// A proof of indexing/serving/relay work offered by a peer, pre-translation
/// into a local `WorkItem` (the mempool assigns the canonical id on ingest).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemOfferPayload {
    pub item_type: WorkItemType,
    pub data_hex: String,
    pub timestamp: u64,
}

/// Declares a newly mined block to the overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockAnnouncePayload {
    pub hash: String,
    pub height: u64,
    pub miner_address: String,
    pub timestamp: u64,
    pub bits: u32,
    pub target_hex: String,
    pub merkle_root: String,
    pub prev_hash: String,
    pub nonce: u64,
    pub version: u32,
    pub item_count: u64,
}

impl BlockAnnouncePayload {
    pub fn hash_bytes(&self) -> Result<Hash> {
        decode_hash(&self.hash)
    }

    pub fn merkle_root_bytes(&self) -> Result<Hash> {
        decode_hash(&self.merkle_root)
    }

    pub fn prev_hash_bytes(&self) -> Result<Hash> {
        decode_hash(&self.prev_hash)
    }
}

fn decode_hash(s: &str) -> Result<Hash> {
    let bytes = hex::decode(s).map_err(|e| Error::ProtocolViolation(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(Error::ProtocolViolation(format!(
            "expected 32-byte hash, got {} bytes",
            bytes.len()
        )));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// The signed envelope carried on the pub-sub topic. `signature` is over
/// `SHA256(message_type || payload || nonce)` using the node's gossip
/// identity key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub sender_id: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub nonce: u64,
    pub payload: serde_json::Value,
    pub signature: String,
}

impl Envelope {
    fn signing_digest(message_type: &MessageType, payload: &serde_json::Value, nonce: u64) -> Result<[u8; 32]> {
        let payload_bytes =
            serde_json::to_vec(payload).map_err(|e| Error::ProtocolViolation(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(message_type.as_wire_str().as_bytes());
        hasher.update(&payload_bytes);
        hasher.update(nonce.to_le_bytes());
        Ok(hasher.finalize().into())
    }

    /// Builds and signs a new envelope with `identity`.
    pub fn sign(
        identity: &Keypair,
        sender_id: String,
        message_type: MessageType,
        payload: serde_json::Value,
        nonce: u64,
    ) -> Result<Self> {
        let digest = Self::signing_digest(&message_type, &payload, nonce)?;
        let signature = identity
            .sign(&digest)
            .map_err(|e| Error::BadIdentity(e.to_string()))?;
        Ok(Self {
            sender_id,
            message_type,
            nonce,
            payload,
            signature: hex::encode(signature),
        })
    }

    /// Validates the envelope's signature against `public_key`. Callers
    /// penalise reputation and drop the message on failure; they never
    /// propagate a rejection as a hard error, only `Error::ValidationReject`.
    pub fn verify(&self, public_key: &libp2p::identity::PublicKey) -> Result<()> {
        let digest = Self::signing_digest(&self.message_type, &self.payload, self.nonce)?;
        let sig_bytes = hex::decode(&self.signature).map_err(|e| Error::ProtocolViolation(e.to_string()))?;
        if public_key.verify(&digest, &sig_bytes) {
            Ok(())
        } else {
            Err(Error::ValidationReject)
        }
    }

    pub fn decode_work_item_offer(&self) -> Result<WorkItemOfferPayload> {
        serde_json::from_value(self.payload.clone()).map_err(|e| Error::ProtocolViolation(e.to_string()))
    }

    pub fn decode_block_announce(&self) -> Result<BlockAnnouncePayload> {
        serde_json::from_value(self.payload.clone()).map_err(|e| Error::ProtocolViolation(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let keypair = Keypair::generate_ed25519();
        let payload = serde_json::json!({"hello": "world"});
        let envelope = Envelope::sign(
            &keypair,
            hex::encode(keypair.public().to_peer_id().to_bytes()),
            MessageType::WorkItemOffer,
            payload,
            7,
        )
        .unwrap();
        envelope.verify(&keypair.public()).unwrap();
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let keypair = Keypair::generate_ed25519();
        let mut envelope = Envelope::sign(
            &keypair,
            "sender".into(),
            MessageType::BlockAnnounce,
            serde_json::json!({"height": 1}),
            1,
        )
        .unwrap();
        envelope.payload = serde_json::json!({"height": 2});
        assert!(envelope.verify(&keypair.public()).is_err());
    }

    #[test]
    fn wrong_key_fails_verification() {
        let signer = Keypair::generate_ed25519();
        let other = Keypair::generate_ed25519();
        let envelope = Envelope::sign(
            &signer,
            "sender".into(),
            MessageType::WorkItemOffer,
            serde_json::json!({}),
            0,
        )
        .unwrap();
        assert!(envelope.verify(&other.public()).is_err());
    }

    #[test]
    fn block_announce_payload_decodes_hashes() {
        let payload = BlockAnnouncePayload {
            hash: "11".repeat(32),
            height: 5,
            miner_address: "addr".into(),
            timestamp: 1000,
            bits: 0x1e00ffff,
            target_hex: "ff".repeat(32),
            merkle_root: "22".repeat(32),
            prev_hash: "00".repeat(32),
            nonce: 9,
            version: 1,
            item_count: 1,
        };
        assert_eq!(payload.hash_bytes().unwrap(), [0x11u8; 32]);
        assert_eq!(payload.merkle_root_bytes().unwrap(), [0x22u8; 32]);
    }
}
