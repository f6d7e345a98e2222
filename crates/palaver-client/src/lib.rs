//! # palaver-client
//!
//! The realtime synchronization engine: subscribes to server-pushed entity
//! events, filters them by chat membership, merges them into the local
//! projection, and exposes `emit` — the single "propose mutation" entry
//! point that confirms a write against the HTTP API before broadcasting the
//! canonical result to every subscriber, the caller included.

pub mod api;
pub mod dispatch;
pub mod membership;
pub mod router;
pub mod session;

mod error;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{HttpApi, MemberInvite, MessageDraft, RemoteApi};
pub use error::{ApiError, ApiResult};
pub use membership::is_member;
pub use session::RealtimeSession;

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise structured logging for a client process.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("palaver_client=debug,palaver_net=debug,palaver_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
