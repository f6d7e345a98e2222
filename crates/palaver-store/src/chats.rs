//! Chat record operations.

use palaver_shared::{Chat, ChatPatch};

use crate::projection::ProjectionStore;

impl ProjectionStore {
    /// Insert or replace a chat by id.
    pub fn upsert_chat(&mut self, chat: Chat) {
        self.chats.insert(chat.id, chat);
    }

    /// Shallow-merge a partial chat payload into an existing record.
    /// No-op when the chat is not present; existence is the router's call.
    pub fn merge_chat(&mut self, patch: ChatPatch) {
        let Some(id) = patch.target_id() else {
            return;
        };
        if let Some(chat) = self.chats.get_mut(&id) {
            chat.apply(patch);
        }
    }

    /// Delete a chat. Returns `true` when a record was removed. The caller
    /// is responsible for clearing the chat's message list in the same
    /// logical step.
    pub fn remove_chat(&mut self, id: i64) -> bool {
        self.chats.remove(&id).is_some()
    }

    pub fn contains_chat(&self, id: i64) -> bool {
        self.chats.contains_key(&id)
    }

    pub fn get_chat(&self, id: i64) -> Option<&Chat> {
        self.chats.get(&id)
    }

    pub fn chat_count(&self) -> usize {
        self.chats.len()
    }
}
