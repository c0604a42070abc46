//! Combined libp2p behaviour: gossipsub for the pub-sub topic, identify
//! for peer metadata exchange, and Kademlia for optional DHT-assisted
//! discovery.

use libp2p::{gossipsub, identify, kad, swarm::NetworkBehaviour};

#[derive(NetworkBehaviour)]
pub struct ClawMinerBehaviour {
    pub gossipsub: gossipsub::Behaviour,
    pub identify: identify::Behaviour,
    pub kad: kad::Behaviour<kad::store::MemoryStore>,
}
