//! Composed libp2p `NetworkBehaviour` for the Palaver bus.
//!
//! Combines GossipSub (topic pub/sub for entity events) and Identify
//! (protocol negotiation with the broker and other clients).

use libp2p::{gossipsub, identify, swarm::NetworkBehaviour};

/// Composed network behaviour for Palaver bus nodes.
///
/// Both sub-behaviours are driven by the single bus event loop.
/// Construction is handled by [`super::transport::build_swarm`] via
/// `SwarmBuilder`.
#[derive(NetworkBehaviour)]
#[behaviour(to_swarm = "BusEvent")]
pub struct BusBehaviour {
    /// Topic pub/sub carrying the entity event envelopes
    pub gossipsub: gossipsub::Behaviour,
    /// Protocol identification and capability advertisement
    pub identify: identify::Behaviour,
}

/// Events emitted by the composed behaviour, one variant per sub-behaviour.
#[derive(Debug)]
pub enum BusEvent {
    Gossipsub(gossipsub::Event),
    Identify(identify::Event),
}

impl From<gossipsub::Event> for BusEvent {
    fn from(event: gossipsub::Event) -> Self {
        BusEvent::Gossipsub(event)
    }
}

impl From<identify::Event> for BusEvent {
    fn from(event: identify::Event) -> Self {
        BusEvent::Identify(event)
    }
}
