//! The membership filter: does a chat concern the current viewer?
//!
//! Pure predicate, consulted by the router before any store write for chat
//! events. The policy is fail-open while the viewer is unknown (blocking
//! would hide everything from a not-yet-identified session) and fail-closed
//! once the viewer is known and the payload enumerates members.

use palaver_shared::ChatMember;

/// `true` when the member list includes the viewer.
///
/// * Unknown viewer: always `true`.
/// * Known viewer, no members collection asserted: `false`.
/// * Otherwise: membership by normalized `member_id`.
pub fn is_member(members: Option<&[ChatMember]>, viewer_id: Option<i64>) -> bool {
    let Some(viewer_id) = viewer_id else {
        return true;
    };
    let Some(members) = members else {
        return false;
    };
    members.iter().any(|m| m.member_id == viewer_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use palaver_shared::ChatMember;
    use serde_json::json;

    fn members(payload: serde_json::Value) -> Vec<ChatMember> {
        serde_json::from_value(payload).unwrap()
    }

    #[test]
    fn unknown_viewer_fails_open() {
        assert!(is_member(None, None));
        assert!(is_member(Some(&[]), None));
        assert!(is_member(Some(&members(json!([{ "memberId": 1 }]))), None));
    }

    #[test]
    fn known_viewer_fails_closed_without_member_list() {
        assert!(!is_member(None, Some(7)));
    }

    #[test]
    fn matches_every_descriptor_shape() {
        for payload in [
            json!([{ "memberId": 7 }]),
            json!([{ "id": 7 }]),
            json!([{ "userId": 7 }]),
            json!([{ "user": { "id": 7 } }]),
            json!([7]),
            json!(["7"]),
        ] {
            let list = members(payload.clone());
            assert!(is_member(Some(&list), Some(7)), "failed for {payload}");
        }
    }

    #[test]
    fn excluded_viewer_is_rejected() {
        let list = members(json!([{ "memberId": 1 }, { "memberId": 2 }]));
        assert!(!is_member(Some(&list), Some(7)));
        assert!(!is_member(Some(&[]), Some(7)));
    }
}
