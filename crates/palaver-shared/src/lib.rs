//! # palaver-shared
//!
//! Domain model and wire protocol shared by the Palaver client crates:
//! the entity types carried over the realtime bus, the event envelope
//! that frames them, and the normalization of the heterogeneous member
//! descriptor shapes produced by the different backend code paths.

pub mod auth;
pub mod constants;
pub mod member;
pub mod model;
pub mod protocol;

mod error;

pub use error::ProtocolError;
pub use member::{coerce_id, ChatMember, MemberRole};
pub use model::{Chat, ChatPatch, Message, MessagePatch, User, UserPatch};
pub use protocol::{decode_event, ActionKind, EntityKind, EventEnvelope};
