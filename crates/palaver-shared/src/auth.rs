//! Viewer identity resolution.
//!
//! The session's viewer id is read once from the bearer token's payload
//! claims. Any failure yields an unknown viewer, which makes the membership
//! filter fail open until a proper identity is available.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde_json::Value;

/// Extract the numeric `id` claim from a JWT-shaped bearer token.
pub fn viewer_id_from_token(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("id")?.as_i64()
}
