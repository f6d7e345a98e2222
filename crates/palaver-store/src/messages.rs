//! Per-chat message list operations.
//!
//! Lists are ordered by arrival. The owning chat's `last_message_id` is
//! maintained in the same logical step as the list mutation: appends bump
//! it, removals repair it against the most recent remaining message.

use palaver_shared::{Message, MessagePatch};

use crate::projection::ProjectionStore;

impl ProjectionStore {
    /// Replace a chat's message list wholesale (bootstrap snapshot).
    ///
    /// When the chat record exists, `last_message_id` is recomputed as the
    /// most recent message by `created_at`; later list positions win ties.
    pub fn set_messages(&mut self, chat_id: i64, messages: Vec<Message>) {
        let last = messages
            .iter()
            .max_by_key(|m| m.created_at)
            .and_then(|m| m.id);
        self.messages.insert(chat_id, messages);

        if let Some(chat) = self.chats.get_mut(&chat_id) {
            if last.is_some() {
                chat.last_message_id = last;
            }
        }
    }

    /// Append a message to its chat's list, creating the list if absent,
    /// and point the chat at it as the latest message.
    ///
    /// A duplicate `id` appends a second entry; the server contract is that
    /// `add` is delivered once per message.
    pub fn append_message(&mut self, message: Message) {
        let chat_id = message.chat_id;
        let id = message.id;
        self.messages.entry(chat_id).or_default().push(message);

        if let Some(chat) = self.chats.get_mut(&chat_id) {
            chat.last_message_id = id;
        }
    }

    /// Shallow-merge a partial message payload into the matching list
    /// entry. No-op when the chat has no list or the id is not found.
    pub fn merge_message(&mut self, patch: MessagePatch) {
        let (Some(chat_id), Some(id)) = (patch.chat_id, patch.id) else {
            return;
        };
        let Some(list) = self.messages.get_mut(&chat_id) else {
            return;
        };
        if let Some(message) = list.iter_mut().find(|m| m.id == Some(id)) {
            message.apply(patch);
        }
    }

    /// Remove a message from its chat's list. When it was the chat's last
    /// message, the pointer moves to the next most recent remaining message
    /// or is cleared.
    pub fn remove_message(&mut self, chat_id: i64, message_id: i64) {
        let Some(list) = self.messages.get_mut(&chat_id) else {
            return;
        };
        list.retain(|m| m.id != Some(message_id));

        if let Some(chat) = self.chats.get_mut(&chat_id) {
            if chat.last_message_id == Some(message_id) {
                chat.last_message_id = list
                    .iter()
                    .max_by_key(|m| m.created_at)
                    .and_then(|m| m.id);
            }
        }
    }

    /// Drop a chat's entire message list.
    pub fn clear_messages(&mut self, chat_id: i64) {
        self.messages.remove(&chat_id);
    }

    pub fn messages_for(&self, chat_id: i64) -> Option<&[Message]> {
        self.messages.get(&chat_id).map(Vec::as_slice)
    }
}
