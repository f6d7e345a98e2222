//! # palaver-store
//!
//! The local projection of server state: in-memory normalized maps keyed by
//! entity id. The projection is rebuilt from a bootstrap snapshot at session
//! start and then mutated exclusively by the synchronization engine, so no
//! persistence layer sits underneath it.

pub mod chats;
pub mod messages;
pub mod projection;
pub mod users;

pub use projection::ProjectionStore;
