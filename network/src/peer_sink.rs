//! Callback traits the daemon wires at boot: where validated inbound
//! messages and reputation observations are delivered. Kept as traits
//! (not a hard dependency on `clawminer-store`) so the network crate has
//! no persistence dependency of its own.

use crate::envelope::Envelope;

/// Invoked for every envelope that passes signature verification. The
/// implementation is responsible for message-type dispatch.
pub trait InboundHandler: Send + Sync {
    fn handle(&self, sender_id: &str, envelope: &Envelope);
}

/// Receives peer reputation observations: signature/hash/difficulty
/// failures, successful validations, and connection failures. The sink
/// owns clamping to `[0, 100]`; the network crate only reports deltas.
pub trait ReputationSink: Send + Sync {
    fn observe(&self, peer_id: &str, delta: i64, valid: bool);
    fn connection_failed(&self, peer_id: &str);
}

/// A sink that does nothing, for nodes running without a wired daemon
/// (e.g. in tests or tools that only need to publish).
pub struct NoopReputationSink;

impl ReputationSink for NoopReputationSink {
    fn observe(&self, _peer_id: &str, _delta: i64, _valid: bool) {}
    fn connection_failed(&self, _peer_id: &str) {}
}
