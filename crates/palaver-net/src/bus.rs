//! Bus orchestration with tokio mpsc command/notification pattern.
//!
//! The swarm event loop runs in a dedicated tokio task. The sync engine
//! communicates with it through typed command and notification channels,
//! keeping the transport fully asynchronous and decoupled: the engine only
//! ever subscribes to topics and publishes bytes to destinations.
//!
//! Delivery is at-least-once with no ordering guarantee across topics.
//! Events missed while disconnected are not replayed; the engine is
//! expected to be re-seeded from a fresh bootstrap snapshot instead.

use futures::StreamExt;
use libp2p::{gossipsub, identify, swarm::SwarmEvent, Multiaddr, PeerId};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::behaviour::BusEvent;
use crate::transport::build_swarm;

use palaver_shared::constants::DEFAULT_BUS_PORT;

// ---------------------------------------------------------------------------
// Command / notification types
// ---------------------------------------------------------------------------

/// Commands sent *into* the bus task.
#[derive(Debug)]
pub enum BusCommand {
    /// Subscribe to a GossipSub topic (one per entity type).
    Subscribe(String),
    /// Publish a message body to a destination.
    Publish { destination: String, data: Vec<u8> },
    /// Dial a remote node (broker or peer) at the given multiaddr.
    Dial(Multiaddr),
    /// Gracefully shut down the bus.
    Shutdown,
}

/// Notifications sent *from* the bus task to the engine.
#[derive(Debug, Clone)]
pub enum BusNotification {
    /// A message arrived on a subscribed topic.
    EventReceived {
        source: Option<PeerId>,
        topic: String,
        data: Vec<u8>,
    },
    /// A new peer connected.
    PeerConnected { peer_id: PeerId },
    /// A peer disconnected.
    PeerDisconnected { peer_id: PeerId },
}

/// Configuration for spawning the bus.
pub struct BusConfig {
    /// Port to listen on (defaults to `DEFAULT_BUS_PORT`).
    pub listen_port: u16,
    /// Multiaddrs to dial on startup (typically the broker).
    pub dials: Vec<Multiaddr>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_BUS_PORT,
            dials: Vec::new(),
        }
    }
}

/// Spawn the bus in a background tokio task.
///
/// Returns channels for sending commands and receiving notifications,
/// plus the local `PeerId`.
pub async fn spawn_bus(
    keypair: libp2p::identity::Keypair,
    config: BusConfig,
) -> anyhow::Result<(
    mpsc::Sender<BusCommand>,
    mpsc::Receiver<BusNotification>,
    PeerId,
)> {
    let mut swarm = build_swarm(keypair)?;
    let local_peer_id = *swarm.local_peer_id();

    // Listen on QUIC (IPv4 and IPv6)
    let listen_addr_v4: Multiaddr =
        format!("/ip4/0.0.0.0/udp/{}/quic-v1", config.listen_port).parse()?;
    let listen_addr_v6: Multiaddr =
        format!("/ip6/::/udp/{}/quic-v1", config.listen_port).parse()?;

    swarm.listen_on(listen_addr_v4)?;
    swarm.listen_on(listen_addr_v6)?;

    info!(peer_id = %local_peer_id, port = config.listen_port, "Bus listening");

    for addr in &config.dials {
        if let Err(e) = swarm.dial(addr.clone()) {
            warn!(addr = %addr, error = %e, "Failed to dial bus node");
        } else {
            debug!(addr = %addr, "Dialing bus node");
        }
    }

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<BusCommand>(256);
    let (notif_tx, notif_rx) = mpsc::channel::<BusNotification>(256);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                // --- Incoming commands ---
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(BusCommand::Subscribe(topic)) => {
                            let gossipsub_topic = gossipsub::IdentTopic::new(&topic);
                            if let Err(e) = swarm
                                .behaviour_mut()
                                .gossipsub
                                .subscribe(&gossipsub_topic)
                            {
                                error!(topic = %topic, error = %e, "Subscribe failed");
                            }
                        }
                        Some(BusCommand::Publish { destination, data }) => {
                            let gossipsub_topic = gossipsub::IdentTopic::new(&destination);
                            if let Err(e) = swarm
                                .behaviour_mut()
                                .gossipsub
                                .publish(gossipsub_topic, data)
                            {
                                error!(destination = %destination, error = %e, "Publish failed");
                            }
                        }
                        Some(BusCommand::Dial(addr)) => {
                            if let Err(e) = swarm.dial(addr.clone()) {
                                error!(addr = %addr, error = %e, "Dial failed");
                            }
                        }
                        Some(BusCommand::Shutdown) => {
                            info!("Bus shutdown requested");
                            break;
                        }
                        None => {
                            // All senders dropped
                            info!("Command channel closed, shutting down bus");
                            break;
                        }
                    }
                }

                // --- Swarm events ---
                event = swarm.select_next_some() => {
                    match event {
                        SwarmEvent::Behaviour(BusEvent::Gossipsub(
                            gossipsub::Event::Message {
                                propagation_source: _,
                                message_id: _,
                                message,
                            },
                        )) => {
                            let topic = message.topic.to_string();
                            debug!(
                                topic = %topic,
                                source = ?message.source,
                                len = message.data.len(),
                                "Bus message received"
                            );
                            let _ = notif_tx
                                .send(BusNotification::EventReceived {
                                    source: message.source,
                                    topic,
                                    data: message.data,
                                })
                                .await;
                        }

                        SwarmEvent::Behaviour(BusEvent::Identify(
                            identify::Event::Received { peer_id, info, .. },
                        )) => {
                            debug!(
                                peer = %peer_id,
                                protocol = ?info.protocol_version,
                                "Identify: received info from peer"
                            );
                        }

                        SwarmEvent::ConnectionEstablished { peer_id, .. } => {
                            info!(peer = %peer_id, "Peer connected");
                            let _ = notif_tx
                                .send(BusNotification::PeerConnected { peer_id })
                                .await;
                        }

                        SwarmEvent::ConnectionClosed {
                            peer_id,
                            num_established,
                            ..
                        } => {
                            if num_established == 0 {
                                info!(peer = %peer_id, "Peer disconnected");
                                let _ = notif_tx
                                    .send(BusNotification::PeerDisconnected { peer_id })
                                    .await;
                            }
                        }

                        SwarmEvent::NewListenAddr { address, .. } => {
                            info!(addr = %address, "Listening on new address");
                        }

                        SwarmEvent::OutgoingConnectionError { peer_id, error, .. } => {
                            warn!(
                                peer = ?peer_id,
                                error = %error,
                                "Outgoing connection error"
                            );
                        }

                        SwarmEvent::IncomingConnectionError { error, .. } => {
                            warn!(error = %error, "Incoming connection error");
                        }

                        _ => {}
                    }
                }
            }
        }

        info!("Bus event loop terminated");
    });

    Ok((cmd_tx, notif_rx, local_peer_id))
}
