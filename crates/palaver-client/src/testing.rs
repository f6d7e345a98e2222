//! Scripted test doubles shared by the engine's test modules.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::mpsc;

use palaver_net::BusCommand;
use palaver_shared::{Chat, ChatMember, ChatPatch, Message, MessagePatch, User, UserPatch};

use crate::api::{MemberInvite, MessageDraft, RemoteApi};
use crate::error::{ApiError, ApiResult};
use crate::session::RealtimeSession;

/// Scripted [`RemoteApi`] double.
///
/// Every call is appended to `calls`; per-chat responses come from the
/// `chats` and `messages` maps, and `fail_status` makes mutation calls fail
/// wholesale.
pub(crate) struct MockApi {
    pub calls: Mutex<Vec<String>>,
    pub chats: Mutex<HashMap<i64, Result<Chat, u16>>>,
    pub messages: Mutex<HashMap<i64, Vec<Message>>>,
    pub next_message: Mutex<Option<Message>>,
    pub fail_status: Mutex<Option<u16>>,
    pub fail_messages_for: Mutex<Vec<i64>>,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            chats: Mutex::new(HashMap::new()),
            messages: Mutex::new(HashMap::new()),
            next_message: Mutex::new(None),
            fail_status: Mutex::new(None),
            fail_messages_for: Mutex::new(Vec::new()),
        })
    }

    fn record(&self, call: impl Into<String>) -> ApiResult<()> {
        self.calls.lock().unwrap().push(call.into());
        match *self.fail_status.lock().unwrap() {
            Some(status) => Err(ApiError::Status(status)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteApi for MockApi {
    async fn current_user(&self) -> ApiResult<User> {
        self.record("current_user")?;
        Ok(user(1, "viewer"))
    }

    async fn update_profile(&self, _data: &UserPatch) -> ApiResult<User> {
        self.record("update_profile")?;
        Ok(user(1, "viewer"))
    }

    async fn update_avatar(&self, avatar: &str) -> ApiResult<User> {
        self.record(format!("update_avatar:{avatar}"))?;
        let mut me = user(1, "viewer");
        me.avatar_url = Some(avatar.to_string());
        Ok(me)
    }

    async fn list_chats(&self) -> ApiResult<Vec<Chat>> {
        self.record("list_chats")?;
        let mut chats: Vec<Chat> = self
            .chats
            .lock()
            .unwrap()
            .values()
            .filter_map(|entry| entry.as_ref().ok().cloned())
            .collect();
        chats.sort_by_key(|c| c.id);
        Ok(chats)
    }

    async fn get_chat(&self, chat_id: i64) -> ApiResult<Chat> {
        self.calls.lock().unwrap().push(format!("get_chat:{chat_id}"));
        match self.chats.lock().unwrap().get(&chat_id) {
            Some(Ok(chat)) => Ok(chat.clone()),
            Some(Err(status)) => Err(ApiError::Status(*status)),
            None => Err(ApiError::Status(500)),
        }
    }

    async fn create_chat(&self, data: &ChatPatch) -> ApiResult<Chat> {
        self.record("create_chat")?;
        let mut patch = data.clone();
        patch.id = patch.target_id().or(Some(1));
        Ok(Chat::from_patch(patch).ok_or(ApiError::Status(400))?)
    }

    async fn update_chat(&self, chat_id: i64, data: &ChatPatch) -> ApiResult<Chat> {
        self.record(format!("update_chat:{chat_id}"))?;
        let mut patch = data.clone();
        patch.id = Some(chat_id);
        Ok(Chat::from_patch(patch).ok_or(ApiError::Status(400))?)
    }

    async fn delete_chat(&self, chat_id: i64) -> ApiResult<()> {
        self.record(format!("delete_chat:{chat_id}"))
    }

    async fn add_member(&self, chat_id: i64, member: &MemberInvite) -> ApiResult<Chat> {
        self.record(format!("add_member:{chat_id}:{}", member.member_id))?;
        match self.chats.lock().unwrap().get(&chat_id) {
            Some(Ok(chat)) => Ok(chat.clone()),
            _ => Ok(chat_with_members(chat_id, &[member.member_id])),
        }
    }

    async fn remove_member(&self, chat_id: i64, member_id: i64) -> ApiResult<()> {
        self.record(format!("remove_member:{chat_id}:{member_id}"))
    }

    async fn list_messages(&self, chat_id: i64) -> ApiResult<Vec<Message>> {
        self.record(format!("list_messages:{chat_id}"))?;
        if self.fail_messages_for.lock().unwrap().contains(&chat_id) {
            return Err(ApiError::Status(500));
        }
        Ok(self
            .messages
            .lock()
            .unwrap()
            .get(&chat_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_message(&self, data: &MessageDraft) -> ApiResult<Message> {
        self.record("create_message")?;
        Ok(self
            .next_message
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| message_from_draft(1, data)))
    }

    async fn update_message(&self, message_id: i64, data: &MessagePatch) -> ApiResult<Message> {
        self.record(format!("update_message:{message_id}"))?;
        Ok(self.next_message.lock().unwrap().take().unwrap_or_else(|| {
            let mut msg = message(message_id, data.chat_id.unwrap_or_default(), 0);
            msg.apply(data.clone());
            msg
        }))
    }

    async fn delete_message(&self, message_id: i64) -> ApiResult<()> {
        self.record(format!("delete_message:{message_id}"))
    }
}

/// A session wired to a capacity-16 bus channel whose receiver the test
/// holds, so publishes can be observed.
pub(crate) fn test_session(
    api: Arc<MockApi>,
    viewer_id: Option<i64>,
) -> (Arc<RealtimeSession>, mpsc::Receiver<BusCommand>) {
    let (tx, rx) = mpsc::channel(16);
    let session = RealtimeSession::new(api, Some(tx), viewer_id);
    (Arc::new(session), rx)
}

pub(crate) fn user(id: i64, username: &str) -> User {
    User {
        id,
        username: username.to_string(),
        email: format!("{username}@example.test"),
        avatar_url: None,
        bio: None,
    }
}

pub(crate) fn chat_with_members(id: i64, member_ids: &[i64]) -> Chat {
    Chat {
        id,
        title: Some(format!("chat-{id}")),
        is_group: member_ids.len() > 2,
        avatar_url: None,
        members: member_ids.iter().copied().map(ChatMember::bare).collect(),
        last_message_id: None,
        description: None,
        allow_invites: true,
    }
}

/// A message timestamped at 12:{minute} on a fixed day, so relative order
/// in tests is set by the `minute` argument alone.
pub(crate) fn message(id: i64, chat_id: i64, minute: u32) -> Message {
    Message {
        id: Some(id),
        chat_id,
        sender_id: 1,
        content: format!("message-{id}"),
        media_url: None,
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
        view_count: None,
        expire_at: None,
        self_destruct_type: None,
    }
}

fn message_from_draft(id: i64, draft: &MessageDraft) -> Message {
    Message {
        id: Some(id),
        chat_id: draft.chat_id,
        sender_id: draft.sender_id,
        content: draft.content.clone().unwrap_or_default(),
        media_url: draft.media_url.clone(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        view_count: draft.view_count,
        expire_at: draft.expire_at,
        self_destruct_type: draft.self_destruct_type.clone(),
    }
}
