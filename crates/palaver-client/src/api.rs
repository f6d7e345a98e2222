//! The remote call adapter: one request/response call per (entity, action).
//!
//! Every mutation call takes the minimal identifying fields plus the changed
//! fields and returns the full canonical server representation, never a
//! partial. The engine consumes the adapter through the [`RemoteApi`] trait
//! so tests can substitute a scripted double for the HTTP client.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use palaver_shared::constants::DEFAULT_API_URL;
use palaver_shared::{Chat, ChatPatch, MemberRole, Message, MessagePatch, User, UserPatch};

use crate::error::{ApiError, ApiResult};

/// Fields a caller supplies when creating or editing a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDraft {
    pub chat_id: i64,
    pub sender_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
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

/// Body of a membership creation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInvite {
    pub member_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MemberRole>,
}

/// Request/response calls the synchronization engine depends on.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn current_user(&self) -> ApiResult<User>;
    async fn update_profile(&self, data: &UserPatch) -> ApiResult<User>;
    async fn update_avatar(&self, avatar: &str) -> ApiResult<User>;

    async fn list_chats(&self) -> ApiResult<Vec<Chat>>;
    async fn get_chat(&self, chat_id: i64) -> ApiResult<Chat>;
    async fn create_chat(&self, data: &ChatPatch) -> ApiResult<Chat>;
    async fn update_chat(&self, chat_id: i64, data: &ChatPatch) -> ApiResult<Chat>;
    async fn delete_chat(&self, chat_id: i64) -> ApiResult<()>;
    async fn add_member(&self, chat_id: i64, member: &MemberInvite) -> ApiResult<Chat>;
    async fn remove_member(&self, chat_id: i64, member_id: i64) -> ApiResult<()>;

    async fn list_messages(&self, chat_id: i64) -> ApiResult<Vec<Message>>;
    async fn create_message(&self, data: &MessageDraft) -> ApiResult<Message>;
    async fn update_message(&self, message_id: i64, data: &MessagePatch) -> ApiResult<Message>;
    async fn delete_message(&self, message_id: i64) -> ApiResult<()>;
}

/// [`RemoteApi`] implementation over the backend's HTTP interface, with
/// bearer-token auth attached to every request.
pub struct HttpApi {
    http: Client,
    base_url: String,
    token: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> ApiResult<Self> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Adapter against the default backend address.
    pub fn with_default_url(token: impl Into<String>) -> ApiResult<Self> {
        Self::new(DEFAULT_API_URL, token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn check(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ApiError::Status(status.as_u16()))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(Self::check(response)?.json().await?)
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let response = self
            .http
            .request(method, self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Ok(Self::check(response)?.json().await?)
    }

    async fn delete(&self, path: &str) -> ApiResult<()> {
        let response = self
            .http
            .delete(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(response)?;
        Ok(())
    }
}

#[async_trait]
impl RemoteApi for HttpApi {
    async fn current_user(&self) -> ApiResult<User> {
        self.get_json("/users/me").await
    }

    async fn update_profile(&self, data: &UserPatch) -> ApiResult<User> {
        self.send_json(reqwest::Method::PATCH, "/users/me", data)
            .await
    }

    async fn update_avatar(&self, avatar: &str) -> ApiResult<User> {
        self.send_json(
            reqwest::Method::PATCH,
            "/users/me/avatar",
            &serde_json::json!({ "avatar": avatar }),
        )
        .await
    }

    async fn list_chats(&self) -> ApiResult<Vec<Chat>> {
        self.get_json("/chats/user").await
    }

    async fn get_chat(&self, chat_id: i64) -> ApiResult<Chat> {
        self.get_json(&format!("/chats/{chat_id}")).await
    }

    async fn create_chat(&self, data: &ChatPatch) -> ApiResult<Chat> {
        self.send_json(reqwest::Method::POST, "/chats", data).await
    }

    async fn update_chat(&self, chat_id: i64, data: &ChatPatch) -> ApiResult<Chat> {
        self.send_json(reqwest::Method::PUT, &format!("/chats/{chat_id}"), data)
            .await
    }

    async fn delete_chat(&self, chat_id: i64) -> ApiResult<()> {
        self.delete(&format!("/chats/{chat_id}")).await
    }

    async fn add_member(&self, chat_id: i64, member: &MemberInvite) -> ApiResult<Chat> {
        self.send_json(
            reqwest::Method::POST,
            &format!("/chats/{chat_id}/members"),
            member,
        )
        .await
    }

    async fn remove_member(&self, chat_id: i64, member_id: i64) -> ApiResult<()> {
        self.delete(&format!("/chats/{chat_id}/members/{member_id}"))
            .await
    }

    async fn list_messages(&self, chat_id: i64) -> ApiResult<Vec<Message>> {
        self.get_json(&format!("/messages/{chat_id}")).await
    }

    async fn create_message(&self, data: &MessageDraft) -> ApiResult<Message> {
        self.send_json(reqwest::Method::POST, "/messages", data)
            .await
    }

    async fn update_message(&self, message_id: i64, data: &MessagePatch) -> ApiResult<Message> {
        self.send_json(
            reqwest::Method::PUT,
            &format!("/messages/{message_id}"),
            data,
        )
        .await
    }

    async fn delete_message(&self, message_id: i64) -> ApiResult<()> {
        self.delete(&format!("/messages/{message_id}")).await
    }
}
