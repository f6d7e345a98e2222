//! Entity types held in the local projection, plus their partial-update
//! patch counterparts.
//!
//! Push payloads are frequently partial: a `chat/update` may assert only a
//! title, a `message/update` only new content. The `*Patch` types keep
//! "field absent" distinguishable from "field cleared" so a shallow merge
//! overwrites exactly what the payload asserted and nothing else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::member::ChatMember;

/// A known user of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// Partial user payload, as carried by `user/update` and `user/update-avatar`
/// events and by profile mutation calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl User {
    /// Shallow-merge a patch: every asserted field overwrites.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(avatar_url) = patch.avatar_url {
            self.avatar_url = Some(avatar_url);
        }
        if let Some(bio) = patch.bio {
            self.bio = Some(bio);
        }
    }

    /// Build a record from a partial payload; requires an id.
    pub fn from_patch(patch: UserPatch) -> Option<Self> {
        let mut user = Self {
            id: patch.id?,
            username: String::new(),
            email: String::new(),
            avatar_url: None,
            bio: None,
        };
        user.apply(UserPatch { id: None, ..patch });
        Some(user)
    }
}

/// A chat, with its member list as the authority for visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, deserialize_with = "crate::member::lenient_member_list")]
    pub members: Vec<ChatMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub allow_invites: bool,
}

/// Partial chat payload.
///
/// `last_message_id` is doubly optional: the outer level distinguishes "not
/// asserted" from an explicit `null` clearing the pointer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_group: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(
        deserialize_with = "crate::member::lenient_member_list_asserted",
        skip_serializing_if = "Option::is_none"
    )]
    pub members: Option<Vec<ChatMember>>,
    #[serde(deserialize_with = "asserted", skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_invites: Option<bool>,
}

impl ChatPatch {
    /// The chat this patch addresses; membership events carry the id under
    /// `chatId` rather than `id`.
    pub fn target_id(&self) -> Option<i64> {
        self.id.or(self.chat_id)
    }
}

impl Chat {
    pub fn apply(&mut self, patch: ChatPatch) {
        if let Some(title) = patch.title {
            self.title = Some(title);
        }
        if let Some(is_group) = patch.is_group {
            self.is_group = is_group;
        }
        if let Some(avatar_url) = patch.avatar_url {
            self.avatar_url = Some(avatar_url);
        }
        if let Some(members) = patch.members {
            self.members = members;
        }
        if let Some(last_message_id) = patch.last_message_id {
            self.last_message_id = last_message_id;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(allow_invites) = patch.allow_invites {
            self.allow_invites = allow_invites;
        }
    }

    pub fn from_patch(patch: ChatPatch) -> Option<Self> {
        let mut chat = Self {
            id: patch.target_id()?,
            title: None,
            is_group: false,
            avatar_url: None,
            members: Vec::new(),
            last_message_id: None,
            description: None,
            allow_invites: false,
        };
        chat.apply(ChatPatch {
            id: None,
            chat_id: None,
            ..patch
        });
        Some(chat)
    }
}

/// A chat message. `id` is assigned server-side, so locally drafted
/// messages do not carry one until the create call echoes it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub chat_id: i64,
    pub sender_id: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<i64>,
    #[serde(
        default,
        rename = "expire_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub expire_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_destruct_type: Option<String>,
}

/// Partial message payload for `message/update` events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<i64>,
    #[serde(
        rename = "expire_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub expire_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_destruct_type: Option<String>,
}

impl Message {
    pub fn apply(&mut self, patch: MessagePatch) {
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(media_url) = patch.media_url {
            self.media_url = Some(media_url);
        }
        if let Some(created_at) = patch.created_at {
            self.created_at = created_at;
        }
        if let Some(view_count) = patch.view_count {
            self.view_count = Some(view_count);
        }
        if let Some(expire_at) = patch.expire_at {
            self.expire_at = Some(expire_at);
        }
        if let Some(self_destruct_type) = patch.self_destruct_type {
            self.self_destruct_type = Some(self_destruct_type);
        }
    }
}

/// Deserialize a field so that an explicit `null` becomes `Some(None)`
/// while an absent field stays `None` (via `#[serde(default)]`).
fn asserted<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_patch_merge_overwrites_only_asserted_fields() {
        let mut chat: Chat = serde_json::from_value(json!({
            "id": 3,
            "title": "old",
            "isGroup": true,
            "members": [{ "memberId": 1 }, { "memberId": 2 }],
            "lastMessageId": 40,
            "allowInvites": true
        }))
        .unwrap();

        let patch: ChatPatch =
            serde_json::from_value(json!({ "id": 3, "title": "new" })).unwrap();
        chat.apply(patch);

        assert_eq!(chat.title.as_deref(), Some("new"));
        assert_eq!(chat.members.len(), 2);
        assert_eq!(chat.last_message_id, Some(40));
        assert!(chat.allow_invites);
    }

    #[test]
    fn chat_patch_distinguishes_null_from_absent_last_message() {
        let absent: ChatPatch = serde_json::from_value(json!({ "id": 3 })).unwrap();
        assert_eq!(absent.last_message_id, None);

        let cleared: ChatPatch =
            serde_json::from_value(json!({ "id": 3, "lastMessageId": null })).unwrap();
        assert_eq!(cleared.last_message_id, Some(None));

        let set: ChatPatch =
            serde_json::from_value(json!({ "id": 3, "lastMessageId": 9 })).unwrap();
        assert_eq!(set.last_message_id, Some(Some(9)));
    }

    #[test]
    fn chat_patch_target_id_falls_back_to_chat_id() {
        let patch: ChatPatch = serde_json::from_value(json!({ "chatId": 11 })).unwrap();
        assert_eq!(patch.target_id(), Some(11));
    }

    #[test]
    fn message_round_trips_with_snake_cased_expire_at() {
        let msg: Message = serde_json::from_value(json!({
            "id": 5,
            "chatId": 3,
            "senderId": 1,
            "content": "hi",
            "createdAt": "2024-05-01T12:00:00Z",
            "expire_at": 60,
            "selfDestructType": "timer"
        }))
        .unwrap();
        assert_eq!(msg.expire_at, Some(60));

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["expire_at"], json!(60));
        assert_eq!(value["chatId"], json!(3));
    }

    #[test]
    fn user_from_partial_payload() {
        let patch: UserPatch =
            serde_json::from_value(json!({ "id": 5, "username": "ada" })).unwrap();
        let user = User::from_patch(patch).unwrap();
        assert_eq!(user.id, 5);
        assert_eq!(user.username, "ada");
        assert_eq!(user.email, "");

        assert!(User::from_patch(UserPatch::default()).is_none());
    }
}
