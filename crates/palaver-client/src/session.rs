//! Per-session engine context.
//!
//! One [`RealtimeSession`] is constructed per authenticated session and
//! explicitly owns everything the engine touches: the projection store, the
//! bus command channel, the remote call adapter, the viewer id resolved from
//! the bearer token, and the set of outstanding background reconciliations.
//! Re-authentication means constructing a new session.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use palaver_net::{BusCommand, BusNotification};
use palaver_shared::auth::viewer_id_from_token;
use palaver_shared::{decode_event, EntityKind};
use palaver_store::ProjectionStore;

use crate::api::RemoteApi;
use crate::error::ApiResult;

/// Context of one authenticated realtime session.
pub struct RealtimeSession {
    pub(crate) store: Arc<Mutex<ProjectionStore>>,
    pub(crate) api: Arc<dyn RemoteApi>,
    pub(crate) bus: Option<mpsc::Sender<BusCommand>>,
    pub(crate) viewer_id: Option<i64>,
    pub(crate) refresh_tasks: Mutex<JoinSet<()>>,
}

impl RealtimeSession {
    /// Create a session over an empty projection.
    ///
    /// `bus` is `None` when no transport is connected; `emit` then no-ops
    /// and no inbound routing occurs.
    pub fn new(
        api: Arc<dyn RemoteApi>,
        bus: Option<mpsc::Sender<BusCommand>>,
        viewer_id: Option<i64>,
    ) -> Self {
        Self {
            store: Arc::new(Mutex::new(ProjectionStore::new())),
            api,
            bus,
            viewer_id,
            refresh_tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Create a session with the viewer id resolved from a bearer token.
    pub fn from_token(
        api: Arc<dyn RemoteApi>,
        bus: Option<mpsc::Sender<BusCommand>>,
        token: &str,
    ) -> Self {
        let viewer_id = viewer_id_from_token(token);
        if viewer_id.is_none() {
            warn!("No viewer id in token; membership filtering disabled for this session");
        }
        Self::new(api, bus, viewer_id)
    }

    /// Handle to the projection store. Collaborating code reads from it;
    /// only this engine writes to it.
    pub fn store(&self) -> Arc<Mutex<ProjectionStore>> {
        Arc::clone(&self.store)
    }

    pub fn viewer_id(&self) -> Option<i64> {
        self.viewer_id
    }

    /// Seed the projection from the request/response API: current user, the
    /// viewer's chats, and each chat's message history.
    pub async fn bootstrap(&self) -> ApiResult<()> {
        let me = self.api.current_user().await?;
        let chats = self.api.list_chats().await?;
        let chat_ids: Vec<i64> = chats.iter().map(|c| c.id).collect();

        if let Some(mut store) = self.lock_store() {
            store.upsert_user(me);
            for chat in chats {
                store.upsert_chat(chat);
            }
        }

        // Message histories seed best-effort: one failing chat must not
        // abandon the rest of the snapshot half-applied.
        for chat_id in &chat_ids {
            match self.api.list_messages(*chat_id).await {
                Ok(messages) => {
                    if let Some(mut store) = self.lock_store() {
                        store.set_messages(*chat_id, messages);
                    }
                }
                Err(e) => {
                    warn!(chat = chat_id, error = %e, "Failed to load message history")
                }
            }
        }

        info!(chats = chat_ids.len(), "Bootstrap snapshot applied");
        Ok(())
    }

    /// Subscribe to the per-entity event topics.
    pub async fn subscribe_topics(&self) {
        let Some(bus) = &self.bus else {
            debug!("No transport session, skipping topic subscriptions");
            return;
        };
        for entity in EntityKind::ALL {
            if bus
                .send(BusCommand::Subscribe(entity.topic()))
                .await
                .is_err()
            {
                warn!(topic = %entity.topic(), "Bus closed while subscribing");
                return;
            }
        }
    }

    /// Pump inbound bus notifications into the router until the bus task
    /// drops its side of the channel.
    ///
    /// Malformed bodies are logged and dropped; the subscription stays
    /// active.
    pub fn spawn_event_pump(
        self: &Arc<Self>,
        mut notifications: mpsc::Receiver<BusNotification>,
    ) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(notification) = notifications.recv().await {
                match notification {
                    BusNotification::EventReceived { topic, data, .. } => {
                        match decode_event(&data) {
                            Ok(event) => session.route(event),
                            Err(e) => {
                                warn!(topic = %topic, error = %e, "Dropping malformed event")
                            }
                        }
                    }
                    BusNotification::PeerConnected { peer_id } => {
                        debug!(peer = %peer_id, "Bus peer connected");
                    }
                    BusNotification::PeerDisconnected { peer_id } => {
                        debug!(peer = %peer_id, "Bus peer disconnected");
                    }
                }
            }
            debug!("Event pump stopped");
        })
    }

    /// Await all outstanding membership reconciliations. Each task carries
    /// its own error boundary, so this never fails.
    pub async fn drain_refreshes(&self) {
        let mut tasks = {
            let Ok(mut guard) = self.refresh_tasks.lock() else {
                error!("Refresh task set lock poisoned");
                return;
            };
            std::mem::take(&mut *guard)
        };
        while tasks.join_next().await.is_some() {}
    }

    /// Tear the session down: stop the bus and drain outstanding
    /// reconciliations.
    pub async fn close(&self) {
        if let Some(bus) = &self.bus {
            let _ = bus.send(BusCommand::Shutdown).await;
        }
        self.drain_refreshes().await;
        info!("Realtime session closed");
    }

    pub(crate) fn lock_store(&self) -> Option<MutexGuard<'_, ProjectionStore>> {
        match self.store.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                error!("Projection store lock poisoned");
                None
            }
        }
    }
}
