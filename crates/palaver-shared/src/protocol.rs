//! Wire-level event framing for the realtime bus.
//!
//! Every inbound bus message is a JSON [`EventEnvelope`]: the entity it
//! concerns, the action applied to it, and an entity-shaped (often partial)
//! payload. Outbound canonical payloads are published bare, to a
//! per-(entity, action) destination; the broker wraps them back into
//! envelopes on the entity topic.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{DESTINATION_PREFIX, TOPIC_PREFIX};
use crate::error::ProtocolError;

/// Entity types carried over the bus, one subscription topic each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Chat,
    Message,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::User, EntityKind::Chat, EntityKind::Message];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Chat => "chat",
            EntityKind::Message => "message",
        }
    }

    /// Topic this entity's events are delivered on.
    pub fn topic(&self) -> String {
        format!("{TOPIC_PREFIX}{}", self.as_str())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions an event can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Add,
    Update,
    UpdateAvatar,
    Remove,
    RemoveMember,
    AddMember,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Add => "add",
            ActionKind::Update => "update",
            ActionKind::UpdateAvatar => "update-avatar",
            ActionKind::Remove => "remove",
            ActionKind::RemoveMember => "remove-member",
            ActionKind::AddMember => "add-member",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination a canonical payload is published to after a confirmed
/// mutation.
pub fn destination(entity: EntityKind, action: ActionKind) -> String {
    format!("{DESTINATION_PREFIX}{entity}/{action}")
}

/// The wire envelope framing every inbound event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub entity: EntityKind,
    pub action: ActionKind,
    #[serde(default)]
    pub data: Value,
}

/// Decode an inbound bus message body.
pub fn decode_event(body: &[u8]) -> Result<EventEnvelope, ProtocolError> {
    Ok(serde_json::from_slice(body)?)
}
