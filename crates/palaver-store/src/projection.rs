//! The projection store container.

use std::collections::HashMap;

use palaver_shared::{Chat, Message, User};

/// Normalized local state: one map per entity type, message lists keyed by
/// the owning chat.
///
/// Message lists are ordered by arrival, not by timestamp; `id` uniqueness
/// within a list is maintained by the update path (replace in place, never
/// duplicate).
#[derive(Debug, Default)]
pub struct ProjectionStore {
    pub(crate) users: HashMap<i64, User>,
    pub(crate) chats: HashMap<i64, Chat>,
    pub(crate) messages: HashMap<i64, Vec<Message>>,
}

impl ProjectionStore {
    /// Create an empty projection.
    pub fn new() -> Self {
        Self::default()
    }
}
