//! The event router: applies decoded inbound events to the projection.
//!
//! Routing never propagates errors to the caller. Payloads that fail to
//! decode are logged and dropped; membership-changing actions whose push
//! payload under-specifies the member list trigger an asynchronous re-fetch
//! against the authoritative source instead of guessing.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, error, warn};

use palaver_shared::{
    coerce_id, ActionKind, Chat, ChatPatch, EventEnvelope, Message, MessagePatch, User, UserPatch,
};
use palaver_store::ProjectionStore;

use crate::api::RemoteApi;
use crate::membership::is_member;
use crate::session::RealtimeSession;

impl RealtimeSession {
    /// Apply one decoded inbound event.
    pub fn route(&self, event: EventEnvelope) {
        let EventEnvelope {
            entity,
            action,
            data,
        } = event;
        match entity {
            palaver_shared::EntityKind::User => self.route_user(action, data),
            palaver_shared::EntityKind::Chat => self.route_chat(action, data),
            palaver_shared::EntityKind::Message => self.route_message(action, data),
        }
    }

    fn route_user(&self, action: ActionKind, data: Value) {
        match action {
            ActionKind::Add => match serde_json::from_value::<User>(data) {
                Ok(user) => {
                    if let Some(mut store) = self.lock_store() {
                        store.upsert_user(user);
                    }
                }
                Err(e) => warn!(error = %e, "Dropping malformed user/add payload"),
            },
            ActionKind::Update | ActionKind::UpdateAvatar => {
                match serde_json::from_value::<UserPatch>(data) {
                    Ok(patch) => {
                        if let Some(mut store) = self.lock_store() {
                            if !store.merge_user(patch) {
                                warn!("Dropping user update without an id");
                            }
                        }
                    }
                    Err(e) => warn!(error = %e, "Dropping malformed user update payload"),
                }
            }
            // User removal has no projection counterpart yet.
            ActionKind::Remove => debug!("Ignoring unsupported user/remove event"),
            _ => debug!(action = %action, "Ignoring inapplicable user action"),
        }
    }

    fn route_chat(&self, action: ActionKind, data: Value) {
        match action {
            ActionKind::Add => match serde_json::from_value::<Chat>(data) {
                Ok(chat) => {
                    if !is_member(Some(&chat.members), self.viewer_id) {
                        debug!(chat = chat.id, "Dropping chat/add outside viewer membership");
                        return;
                    }
                    if let Some(mut store) = self.lock_store() {
                        store.upsert_chat(chat);
                    }
                }
                Err(e) => warn!(error = %e, "Dropping malformed chat/add payload"),
            },
            ActionKind::Update => match serde_json::from_value::<ChatPatch>(data) {
                Ok(patch) => {
                    // A members field that excludes the viewer suppresses the
                    // apply; removal is never inferred from it. Without a
                    // members field nothing was asserted, so no re-check is
                    // possible.
                    if let Some(members) = patch.members.as_deref() {
                        if !is_member(Some(members), self.viewer_id) {
                            debug!(
                                chat = ?patch.target_id(),
                                "Suppressing chat/update that excludes the viewer"
                            );
                            return;
                        }
                    }
                    let Some(id) = patch.target_id() else {
                        warn!("Dropping chat/update without an id");
                        return;
                    };
                    if let Some(mut store) = self.lock_store() {
                        if store.contains_chat(id) {
                            store.merge_chat(patch);
                        } else if let Some(chat) = Chat::from_patch(patch) {
                            store.upsert_chat(chat);
                        }
                    }
                }
                Err(e) => warn!(error = %e, "Dropping malformed chat/update payload"),
            },
            ActionKind::Remove => {
                // Explicit signal; no membership check needed.
                let Some(id) = data.get("id").and_then(coerce_id) else {
                    warn!("Dropping chat/remove without an id");
                    return;
                };
                if let Some(mut store) = self.lock_store() {
                    store.remove_chat(id);
                    store.clear_messages(id);
                }
            }
            ActionKind::RemoveMember | ActionKind::AddMember => {
                // The push payload is minimal and cannot answer membership;
                // reconcile against the authoritative representation.
                let chat_id = data
                    .get("id")
                    .and_then(coerce_id)
                    .or_else(|| data.get("chatId").and_then(coerce_id));
                match chat_id {
                    Some(chat_id) => self.spawn_refresh(chat_id),
                    None => warn!(action = %action, "Dropping membership event without a chat id"),
                }
            }
            _ => debug!(action = %action, "Ignoring inapplicable chat action"),
        }
    }

    fn route_message(&self, action: ActionKind, data: Value) {
        match action {
            ActionKind::Add => match serde_json::from_value::<Message>(data) {
                Ok(message) => {
                    if let Some(mut store) = self.lock_store() {
                        store.append_message(message);
                    }
                }
                Err(e) => warn!(error = %e, "Dropping malformed message/add payload"),
            },
            ActionKind::Update => match serde_json::from_value::<MessagePatch>(data) {
                Ok(patch) => {
                    if patch.id.is_none() || patch.chat_id.is_none() {
                        warn!("Dropping message/update without id and chatId");
                        return;
                    }
                    if let Some(mut store) = self.lock_store() {
                        store.merge_message(patch);
                    }
                }
                Err(e) => warn!(error = %e, "Dropping malformed message/update payload"),
            },
            ActionKind::Remove => {
                let chat_id = data.get("chatId").and_then(coerce_id);
                let message_id = data
                    .get("id")
                    .and_then(coerce_id)
                    .or_else(|| data.get("messageId").and_then(coerce_id));
                let (Some(chat_id), Some(message_id)) = (chat_id, message_id) else {
                    warn!("Dropping message/remove without chatId and id");
                    return;
                };
                if let Some(mut store) = self.lock_store() {
                    store.remove_message(chat_id, message_id);
                }
            }
            _ => debug!(action = %action, "Ignoring inapplicable message action"),
        }
    }

    /// Spawn a membership reconciliation as a tracked background task with
    /// its own error boundary.
    pub(crate) fn spawn_refresh(&self, chat_id: i64) {
        let api = Arc::clone(&self.api);
        let store = Arc::clone(&self.store);
        let viewer_id = self.viewer_id;
        match self.refresh_tasks.lock() {
            Ok(mut tasks) => {
                tasks.spawn(refresh_chat(api, store, viewer_id, chat_id));
            }
            Err(_) => error!("Refresh task set lock poisoned"),
        }
    }
}

/// Re-fetch a chat from the authoritative source and reconcile local state
/// with the viewer's actual membership.
async fn refresh_chat(
    api: Arc<dyn RemoteApi>,
    store: Arc<Mutex<ProjectionStore>>,
    viewer_id: Option<i64>,
    chat_id: i64,
) {
    match api.get_chat(chat_id).await {
        Ok(chat) => {
            let Ok(mut store) = store.lock() else {
                error!("Projection store lock poisoned");
                return;
            };
            if is_member(Some(&chat.members), viewer_id) {
                store.upsert_chat(chat);
            } else {
                store.remove_chat(chat_id);
                store.clear_messages(chat_id);
                debug!(chat = chat_id, "Viewer no longer a member, chat dropped");
            }
        }
        Err(e) if e.is_gone() => {
            let Ok(mut store) = store.lock() else {
                error!("Projection store lock poisoned");
                return;
            };
            store.remove_chat(chat_id);
            store.clear_messages(chat_id);
            debug!(chat = chat_id, error = %e, "Chat gone upstream, dropped");
        }
        // Transient failure: stale state persists until the next successful
        // refresh or an unrelated update touches the chat.
        Err(e) => warn!(chat = chat_id, error = %e, "Failed to refresh chat"),
    }
}
