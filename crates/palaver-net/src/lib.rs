// Pub/sub bus layer built on libp2p GossipSub with QUIC transport.

pub mod behaviour;
pub mod bus;
pub mod transport;

pub use behaviour::{BusBehaviour, BusEvent};
pub use bus::{spawn_bus, BusCommand, BusConfig, BusNotification};
pub use transport::build_swarm;
