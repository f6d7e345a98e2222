//! Normalized chat member descriptors.
//!
//! The backend emits member entries in several shapes depending on the code
//! path that produced them: a bare numeric or string id, or an object
//! carrying the id under `memberId`, `id`, `userId`, or a nested `user.id`.
//! All of them are collapsed into [`ChatMember`] at the deserialization
//! boundary so the rest of the engine only ever matches on `member_id`.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a member within a chat. Authorization decisions based on it
/// belong to collaborating UI code, not to the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberRole {
    #[serde(rename = "OWNER")]
    Owner,
    #[serde(rename = "MEMBER")]
    Member,
}

impl MemberRole {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "OWNER" => Some(Self::Owner),
            "MEMBER" => Some(Self::Member),
            _ => None,
        }
    }
}

/// A chat participant, normalized from whatever shape the payload carried.
///
/// Only `member_id` is guaranteed; the profile fields are present when the
/// payload was a full server representation and absent for the minimal
/// descriptors found in push updates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMember {
    pub member_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<MemberRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl ChatMember {
    /// A descriptor that carries nothing but the member id.
    pub fn bare(member_id: i64) -> Self {
        Self {
            member_id,
            chat_id: None,
            role: None,
            username: None,
            email: None,
            avatar_url: None,
            bio: None,
        }
    }

    /// Normalize a raw JSON member descriptor.
    ///
    /// Returns `None` when no identifying field can be extracted, which is
    /// the one shape the closed representation cannot carry.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(_) | Value::String(_) => coerce_id(value).map(Self::bare),
            Value::Object(map) => {
                let user = map.get("user");
                let member_id = map
                    .get("memberId")
                    .and_then(coerce_id)
                    .or_else(|| map.get("id").and_then(coerce_id))
                    .or_else(|| map.get("userId").and_then(coerce_id))
                    .or_else(|| user.and_then(|u| u.get("id")).and_then(coerce_id))?;

                Some(Self {
                    member_id,
                    chat_id: map.get("chatId").and_then(coerce_id),
                    role: map
                        .get("role")
                        .and_then(Value::as_str)
                        .and_then(MemberRole::parse),
                    username: string_field(map, user, "username"),
                    email: string_field(map, user, "email"),
                    avatar_url: string_field(map, user, "avatarUrl"),
                    bio: string_field(map, user, "bio"),
                })
            }
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for ChatMember {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        ChatMember::from_value(&value)
            .ok_or_else(|| de::Error::custom("member descriptor has no identifying field"))
    }
}

/// Deserialize a member list leniently: entries with no identifying field
/// are skipped rather than failing the containing payload, so one odd
/// entry cannot hide a whole chat. `null` in place of the list reads as
/// empty.
pub fn lenient_member_list<'de, D>(deserializer: D) -> Result<Vec<ChatMember>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values.iter().filter_map(ChatMember::from_value).collect())
}

/// Lenient member list for patch payloads: an absent or `null` field stays
/// "not asserted".
pub fn lenient_member_list_asserted<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<ChatMember>>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(values.map(|values| values.iter().filter_map(ChatMember::from_value).collect()))
}

/// Coerce a JSON value to a numeric id the way loosely-typed payloads
/// expect: numbers are taken as-is, strings are parsed.
pub fn coerce_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a string field from the descriptor itself, falling back to the
/// nested `user` object.
fn string_field(
    map: &serde_json::Map<String, Value>,
    user: Option<&Value>,
    key: &str,
) -> Option<String> {
    map.get(key)
        .or_else(|| user.and_then(|u| u.get(key)))
        .and_then(Value::as_str)
        .map(str::to_owned)
}
