//! The mutation dispatcher: `emit`, the single "propose mutation" entry
//! point for UI-triggering code.
//!
//! A mutation is first confirmed through the remote call adapter; only the
//! canonical payload the server returns is broadcast on the bus, where the
//! router applies it on every connected client — the caller included. The
//! caller's optimistic copy never touches the store directly, so local state
//! changes through exactly one code path.
//!
//! Failures are absorbed: a failed remote call means nothing is published,
//! nothing changes locally, and the caller sees `None`.

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use palaver_net::BusCommand;
use palaver_shared::{
    coerce_id, protocol, ActionKind, ChatPatch, EntityKind, MemberRole, MessagePatch,
    ProtocolError, UserPatch,
};

use crate::api::{MemberInvite, MessageDraft};
use crate::error::ApiError;
use crate::session::RealtimeSession;

#[derive(Error, Debug)]
enum EmitError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("unsupported entity/action pair")]
    Unsupported,
}

impl RealtimeSession {
    /// Propose a mutation: confirm it remotely, broadcast the canonical
    /// result, and return it.
    ///
    /// Returns `None` when no transport session is active or when the
    /// remote call fails; callers wanting user-visible error detail must
    /// treat an absent result as "operation did not complete".
    pub async fn emit(
        &self,
        entity: EntityKind,
        action: ActionKind,
        data: Value,
    ) -> Option<Value> {
        let bus = self.bus.as_ref()?;

        let payload = match self.confirm(entity, action, &data).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(
                    entity = %entity,
                    action = %action,
                    error = %e,
                    "Mutation aborted before broadcast"
                );
                return None;
            }
        };

        // Published only after the remote call resolved: observers of this
        // broadcast can rely on the entity already existing server-side, so
        // a refresh racing the publish is safe.
        let destination = protocol::destination(entity, action);
        match serde_json::to_vec(&payload) {
            Ok(body) => {
                if bus
                    .send(BusCommand::Publish {
                        destination: destination.clone(),
                        data: body,
                    })
                    .await
                    .is_err()
                {
                    warn!(destination = %destination, "Bus closed, canonical payload not broadcast");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize canonical payload"),
        }

        debug!(destination = %destination, "Mutation confirmed and broadcast");
        Some(payload)
    }

    /// Perform the per-(entity, action) remote call and produce the
    /// canonical payload to broadcast.
    async fn confirm(
        &self,
        entity: EntityKind,
        action: ActionKind,
        data: &Value,
    ) -> Result<Value, EmitError> {
        match (entity, action) {
            (EntityKind::Message, ActionKind::Add) => {
                let draft: MessageDraft = decode(data)?;
                to_payload(self.api.create_message(&draft).await?)
            }
            (EntityKind::Message, ActionKind::Update) => {
                let id = require_id(data, "id")?;
                let patch: MessagePatch = decode(data)?;
                to_payload(self.api.update_message(id, &patch).await?)
            }
            (EntityKind::Message, ActionKind::Remove) => {
                let id = require_id(data, "id")?;
                let chat_id = require_id(data, "chatId")?;
                self.api.delete_message(id).await?;
                // The server echoes no body for deletes.
                Ok(json!({ "chatId": chat_id, "id": id }))
            }

            (EntityKind::Chat, ActionKind::Add) => {
                let draft: ChatPatch = decode(data)?;
                to_payload(self.api.create_chat(&draft).await?)
            }
            (EntityKind::Chat, ActionKind::Update) => {
                let id = require_id(data, "id")?;
                let draft: ChatPatch = decode(data)?;
                to_payload(self.api.update_chat(id, &draft).await?)
            }
            (EntityKind::Chat, ActionKind::Remove) => {
                let id = require_id(data, "id")?;
                self.api.delete_chat(id).await?;
                Ok(json!({ "id": id }))
            }
            (EntityKind::Chat, ActionKind::RemoveMember) => {
                let id = require_id(data, "id")?;
                let member_id = require_id(data, "memberId")?;
                self.api.remove_member(id, member_id).await?;
                // The broadcast stays minimal; every client reconciles from
                // the authoritative source.
                self.spawn_refresh(id);
                Ok(json!({ "id": id, "memberId": member_id }))
            }
            (EntityKind::Chat, ActionKind::AddMember) => {
                let id = require_id(data, "id")?;
                let member_id = require_id(data, "memberId")?;
                let role = decode_role(data)?;
                self.api
                    .add_member(id, &MemberInvite { member_id, role })
                    .await?;
                self.spawn_refresh(id);
                let mut payload = json!({ "id": id, "memberId": member_id });
                if let Some(role) = role {
                    payload["role"] = serde_json::to_value(role).map_err(ProtocolError::Decode)?;
                }
                Ok(payload)
            }

            (EntityKind::User, ActionKind::Update) => {
                let draft: UserPatch = decode(data)?;
                to_payload(self.api.update_profile(&draft).await?)
            }
            (EntityKind::User, ActionKind::UpdateAvatar) => {
                // Accepts the bare avatar value or an object wrapping it.
                let avatar = data
                    .get("avatar")
                    .and_then(Value::as_str)
                    .or_else(|| data.as_str())
                    .ok_or(ProtocolError::MissingField("avatar"))?;
                to_payload(self.api.update_avatar(avatar).await?)
            }

            _ => Err(EmitError::Unsupported),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(data: &Value) -> Result<T, EmitError> {
    serde_json::from_value(data.clone())
        .map_err(ProtocolError::Decode)
        .map_err(EmitError::from)
}

fn decode_role(data: &Value) -> Result<Option<MemberRole>, EmitError> {
    match data.get("role") {
        Some(value) if !value.is_null() => Ok(Some(
            serde_json::from_value(value.clone()).map_err(ProtocolError::Decode)?,
        )),
        _ => Ok(None),
    }
}

fn require_id(data: &Value, field: &'static str) -> Result<i64, EmitError> {
    data.get(field)
        .and_then(coerce_id)
        .ok_or_else(|| ProtocolError::MissingField(field).into())
}

fn to_payload<T: serde::Serialize>(value: T) -> Result<Value, EmitError> {
    serde_json::to_value(value)
        .map_err(ProtocolError::Decode)
        .map_err(EmitError::from)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tokio::sync::mpsc::error::TryRecvError;

    use palaver_net::BusCommand;
    use palaver_shared::{ActionKind, EntityKind};

    use crate::session::RealtimeSession;
    use crate::testing::{chat_with_members, message, test_session, MockApi};

    #[tokio::test]
    async fn emit_without_transport_session_is_a_silent_noop() {
        let api = MockApi::new();
        let session = RealtimeSession::new(Arc::clone(&api) as _, None, Some(7));

        let result = session
            .emit(
                EntityKind::Message,
                ActionKind::Add,
                json!({ "chatId": 3, "senderId": 7, "content": "hi" }),
            )
            .await;

        assert!(result.is_none());
        assert!(api.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn message_add_broadcasts_canonical_payload_after_confirmation() {
        let api = MockApi::new();
        let canonical = message(99, 3, 0);
        *api.next_message.lock().unwrap() = Some(canonical.clone());
        let (session, mut bus_rx) = test_session(Arc::clone(&api), Some(7));

        // Nothing on the bus before the call.
        assert!(matches!(bus_rx.try_recv(), Err(TryRecvError::Empty)));

        let result = session
            .emit(
                EntityKind::Message,
                ActionKind::Add,
                json!({ "chatId": 3, "senderId": 1, "content": "hi" }),
            )
            .await
            .expect("mutation confirmed");

        let expected = serde_json::to_value(&canonical).unwrap();
        assert_eq!(result, expected);
        assert_eq!(api.calls.lock().unwrap().as_slice(), ["create_message"]);

        let BusCommand::Publish { destination, data } = bus_rx.try_recv().unwrap() else {
            panic!("expected a publish command");
        };
        assert_eq!(destination, "/app/message/add");
        assert_eq!(data, serde_json::to_vec(&expected).unwrap());
        assert!(matches!(bus_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn failed_remote_call_publishes_nothing_and_returns_none() {
        let api = MockApi::new();
        *api.fail_status.lock().unwrap() = Some(500);
        let (session, mut bus_rx) = test_session(Arc::clone(&api), Some(7));

        let result = session
            .emit(
                EntityKind::Message,
                ActionKind::Add,
                json!({ "chatId": 3, "senderId": 1, "content": "hi" }),
            )
            .await;

        assert!(result.is_none());
        assert!(matches!(bus_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn message_update_needs_only_id_and_changed_fields() {
        let api = MockApi::new();
        let (session, mut bus_rx) = test_session(Arc::clone(&api), Some(7));

        let result = session
            .emit(
                EntityKind::Message,
                ActionKind::Update,
                json!({ "id": 99, "chatId": 3, "content": "edited" }),
            )
            .await
            .expect("partial update confirmed");

        assert_eq!(result["content"], json!("edited"));
        assert_eq!(api.calls.lock().unwrap().as_slice(), ["update_message:99"]);
        let BusCommand::Publish { destination, .. } = bus_rx.try_recv().unwrap() else {
            panic!("expected a publish command");
        };
        assert_eq!(destination, "/app/message/update");
    }

    #[tokio::test]
    async fn message_remove_synthesizes_the_minimal_payload() {
        let api = MockApi::new();
        let (session, mut bus_rx) = test_session(Arc::clone(&api), Some(7));

        let result = session
            .emit(
                EntityKind::Message,
                ActionKind::Remove,
                json!({ "id": 99, "chatId": 3, "content": "ignored" }),
            )
            .await
            .unwrap();

        assert_eq!(result, json!({ "chatId": 3, "id": 99 }));
        assert_eq!(api.calls.lock().unwrap().as_slice(), ["delete_message:99"]);
        let BusCommand::Publish { destination, .. } = bus_rx.try_recv().unwrap() else {
            panic!("expected a publish command");
        };
        assert_eq!(destination, "/app/message/remove");
    }

    #[tokio::test]
    async fn chat_remove_member_confirms_publishes_and_refreshes() {
        let api = MockApi::new();
        api.chats
            .lock()
            .unwrap()
            .insert(10, Ok(chat_with_members(10, &[2, 7])));
        let (session, mut bus_rx) = test_session(Arc::clone(&api), Some(7));

        let result = session
            .emit(
                EntityKind::Chat,
                ActionKind::RemoveMember,
                json!({ "id": 10, "memberId": 2 }),
            )
            .await
            .unwrap();
        session.drain_refreshes().await;

        assert_eq!(result, json!({ "id": 10, "memberId": 2 }));
        let calls = api.calls.lock().unwrap();
        assert_eq!(calls[0], "remove_member:10:2");
        assert!(calls.contains(&"get_chat:10".to_string()));

        let BusCommand::Publish { destination, .. } = bus_rx.try_recv().unwrap() else {
            panic!("expected a publish command");
        };
        assert_eq!(destination, "/app/chat/remove-member");
    }

    #[tokio::test]
    async fn member_ids_are_required_for_membership_mutations() {
        let api = MockApi::new();
        let (session, mut bus_rx) = test_session(Arc::clone(&api), Some(7));

        let result = session
            .emit(EntityKind::Chat, ActionKind::RemoveMember, json!({ "id": 10 }))
            .await;

        assert!(result.is_none());
        assert!(api.calls.lock().unwrap().is_empty());
        assert!(matches!(
            bus_rx.try_recv(),
            Err(tokio::sync::mpsc::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn add_member_includes_role_only_when_given() {
        let api = MockApi::new();
        api.chats
            .lock()
            .unwrap()
            .insert(10, Ok(chat_with_members(10, &[2, 7])));
        let (session, _bus_rx) = test_session(Arc::clone(&api), Some(7));

        let with_role = session
            .emit(
                EntityKind::Chat,
                ActionKind::AddMember,
                json!({ "id": 10, "memberId": 2, "role": "MEMBER" }),
            )
            .await
            .unwrap();
        assert_eq!(with_role, json!({ "id": 10, "memberId": 2, "role": "MEMBER" }));

        let without_role = session
            .emit(
                EntityKind::Chat,
                ActionKind::AddMember,
                json!({ "id": 10, "memberId": 3 }),
            )
            .await
            .unwrap();
        assert_eq!(without_role, json!({ "id": 10, "memberId": 3 }));
        session.drain_refreshes().await;
    }

    #[tokio::test]
    async fn chat_remove_synthesizes_id_payload() {
        let api = MockApi::new();
        let (session, _bus_rx) = test_session(Arc::clone(&api), Some(7));

        let result = session
            .emit(EntityKind::Chat, ActionKind::Remove, json!({ "id": 10 }))
            .await
            .unwrap();

        assert_eq!(result, json!({ "id": 10 }));
        assert_eq!(api.calls.lock().unwrap().as_slice(), ["delete_chat:10"]);
    }

    #[tokio::test]
    async fn update_avatar_accepts_bare_value_or_wrapper_object() {
        let api = MockApi::new();
        let (session, _bus_rx) = test_session(Arc::clone(&api), Some(7));

        session
            .emit(
                EntityKind::User,
                ActionKind::UpdateAvatar,
                json!("/avatars/7.png"),
            )
            .await
            .unwrap();
        session
            .emit(
                EntityKind::User,
                ActionKind::UpdateAvatar,
                json!({ "avatar": "/avatars/8.png" }),
            )
            .await
            .unwrap();

        assert_eq!(
            api.calls.lock().unwrap().as_slice(),
            ["update_avatar:/avatars/7.png", "update_avatar:/avatars/8.png"]
        );
    }

    #[tokio::test]
    async fn unsupported_pairs_are_rejected_up_front() {
        let api = MockApi::new();
        let (session, mut bus_rx) = test_session(Arc::clone(&api), Some(7));

        let result = session
            .emit(EntityKind::User, ActionKind::Add, json!({ "id": 5 }))
            .await;

        assert!(result.is_none());
        assert!(api.calls.lock().unwrap().is_empty());
        assert!(matches!(
            bus_rx.try_recv(),
            Err(tokio::sync::mpsc::error::TryRecvError::Empty)
        ));
    }
}
