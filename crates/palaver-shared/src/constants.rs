/// Protocol version string for libp2p identify
pub const PROTOCOL_VERSION: &str = "/palaver/1.0.0";

/// Application name
pub const APP_NAME: &str = "Palaver";

/// Prefix of the topics the client subscribes to, one per entity type
pub const TOPIC_PREFIX: &str = "/topic/";

/// Prefix of the destinations canonical payloads are published to
pub const DESTINATION_PREFIX: &str = "/app/";

/// Maximum event size in bytes (256 KiB)
pub const MAX_EVENT_SIZE: usize = 262_144;

/// GossipSub heartbeat interval in seconds
pub const GOSSIPSUB_HEARTBEAT_SECS: u64 = 1;

/// Default QUIC listen port for the bus
pub const DEFAULT_BUS_PORT: u16 = 4001;

/// Default base URL of the remote HTTP API
pub const DEFAULT_API_URL: &str = "http://localhost:8080";
