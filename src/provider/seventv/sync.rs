//! 7TV live sync client
//!
//! `connect` fetches the full catalog, opens an EventAPI socket and
//! subscribes to the user's active emote set and user object. A spawned
//! task then applies frames from that socket one at a time. Unexpected
//! closes run `connect` again after the reconnect delay; `disconnect`
//! cancels everything, including a reconnect that is still waiting.
//!
//! Every connection carries a generation number. Only the newest
//! generation may touch shared state or schedule a reconnect.

use super::fetch::SevenTvFetcher;
use super::messages::{
    ClientMessage, DispatchEvent, EmoteSetChange, EmoteSetUpdate, ServerMessage, SubscriptionKind,
};
use super::transport::{EventSocket, EventTransport};
use crate::error::Result;
use crate::provider::{CatalogFetcher, EmoteClient, EmoteProvider};
use crate::types::{Catalog, Emote, SubscriptionIdentity};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const PROVIDER: &str = "7tv";

/// Lifecycle of a live client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Created, `connect` not called yet
    Disconnected,
    /// Fetching the snapshot or opening the socket
    Connecting,
    /// Socket open and subscriptions sent
    Subscribed,
    /// Waiting out the reconnect delay
    Reconnecting,
    /// `disconnect` was called; terminal
    Closed,
}

/// 7TV provider: one live client per platform user
pub struct SevenTvProvider {
    fetcher: Arc<SevenTvFetcher>,
    transport: Arc<dyn EventTransport>,
}

impl SevenTvProvider {
    pub fn new(fetcher: SevenTvFetcher, transport: Arc<dyn EventTransport>) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            transport,
        }
    }

    /// Build a live client without connecting it
    pub fn client(&self, platform_user_id: &str) -> SevenTvClient {
        SevenTvClient::new(
            self.fetcher.clone(),
            self.transport.clone(),
            platform_user_id,
        )
    }
}

#[async_trait]
impl EmoteProvider for SevenTvProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn create_client(&self, platform_user_id: &str) -> Box<dyn EmoteClient> {
        Box::new(self.client(platform_user_id))
    }
}

/// Live-synchronized 7TV catalog for one platform user
///
/// Cheap to clone; clones share the same connection and catalog.
#[derive(Clone)]
pub struct SevenTvClient {
    inner: Arc<SyncInner>,
}

impl SevenTvClient {
    pub fn new(
        fetcher: Arc<SevenTvFetcher>,
        transport: Arc<dyn EventTransport>,
        platform_user_id: impl Into<String>,
    ) -> Self {
        let events_url = fetcher.config().events_url.clone();
        let reconnect_delay = fetcher.config().reconnect_delay();

        Self {
            inner: Arc::new(SyncInner {
                platform_user_id: platform_user_id.into(),
                fetcher,
                transport,
                events_url,
                reconnect_delay,
                catalog: RwLock::new(Catalog::new()),
                identity: Mutex::new(None),
                state: Mutex::new(SyncState::Disconnected),
                generation: AtomicU64::new(0),
                connection: Mutex::new(None),
                closed: CancellationToken::new(),
            }),
        }
    }

    pub fn state(&self) -> SyncState {
        *lock(&self.inner.state)
    }

    /// Objects the current connection is subscribed to
    pub fn identity(&self) -> Option<SubscriptionIdentity> {
        self.inner.identity()
    }

    /// Copy of the current catalog
    pub fn catalog(&self) -> Catalog {
        self.inner.read_catalog().clone()
    }

    pub fn emote_count(&self) -> usize {
        self.inner.read_catalog().len()
    }
}

#[async_trait]
impl EmoteClient for SevenTvClient {
    async fn connect(&self) {
        self.inner.clone().connect().await;
    }

    async fn disconnect(&self) {
        self.inner.close();
    }

    fn get_emotes(&self, text: &str) -> Vec<Emote> {
        self.inner.read_catalog().lookup(text)
    }
}

/// What the connection loop does after a frame
enum Flow {
    Continue,
    Reconnect,
}

struct SyncInner {
    platform_user_id: String,
    fetcher: Arc<SevenTvFetcher>,
    transport: Arc<dyn EventTransport>,
    events_url: String,
    reconnect_delay: Duration,
    catalog: RwLock<Catalog>,
    identity: Mutex<Option<SubscriptionIdentity>>,
    state: Mutex<SyncState>,
    generation: AtomicU64,
    /// Cancels the current connection task when it is superseded
    connection: Mutex<Option<CancellationToken>>,
    closed: CancellationToken,
}

impl SyncInner {
    async fn connect(self: Arc<Self>) {
        if self.closed.is_cancelled() {
            return;
        }
        if !self.has_live_connection() {
            self.set_state(SyncState::Connecting);
        }

        let snapshot = self.fetcher.fetch(&self.platform_user_id).await;
        if self.closed.is_cancelled() {
            return;
        }
        let Some((catalog, identity)) =
            snapshot.and_then(|s| s.identity.map(|identity| (s.catalog, identity)))
        else {
            if self.has_live_connection() {
                tracing::warn!(
                    provider = PROVIDER,
                    user_id = %self.platform_user_id,
                    "Refetch failed, keeping the current connection"
                );
            } else {
                self.schedule_reconnect();
            }
            return;
        };

        self.replace_catalog(catalog);
        *lock(&self.identity) = Some(identity.clone());
        let (generation, token) = self.begin_generation();

        let mut socket = match self.transport.open(&self.events_url).await {
            Ok(socket) => socket,
            Err(e) => {
                tracing::error!(
                    provider = PROVIDER,
                    user_id = %self.platform_user_id,
                    error = %e,
                    "Failed to open event stream"
                );
                token.cancel();
                self.reconnect_if_current(generation);
                return;
            }
        };

        if token.is_cancelled() {
            let _ = socket.close().await;
            return;
        }

        let subscriptions = [
            ClientMessage::subscribe(SubscriptionKind::EmoteSet, &identity.emote_set_id),
            ClientMessage::subscribe(SubscriptionKind::User, &identity.user_id),
        ];
        if let Err(e) = send_all(socket.as_mut(), &subscriptions).await {
            tracing::error!(
                provider = PROVIDER,
                user_id = %self.platform_user_id,
                error = %e,
                "Failed to subscribe to event stream"
            );
            let _ = socket.close().await;
            token.cancel();
            self.reconnect_if_current(generation);
            return;
        }

        self.set_state(SyncState::Subscribed);
        tracing::info!(
            provider = PROVIDER,
            user_id = %identity.user_id,
            emote_set_id = %identity.emote_set_id,
            generation,
            "Subscribed to event stream"
        );

        tokio::spawn(self.run_connection(socket, generation, token));
    }

    async fn run_connection(
        self: Arc<Self>,
        mut socket: Box<dyn EventSocket>,
        generation: u64,
        token: CancellationToken,
    ) {
        loop {
            let frame = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                frame = socket.recv() => frame,
            };

            if !self.is_current(generation) {
                break;
            }

            match frame {
                Some(Ok(text)) => {
                    let flow = self.handle_frame(socket.as_mut(), &text, generation).await;
                    if matches!(flow, Flow::Reconnect) {
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::error!(provider = PROVIDER, error = %e, "Event stream failed");
                    break;
                }
                None => {
                    tracing::debug!(provider = PROVIDER, generation, "Event stream closed by server");
                    break;
                }
            }
        }

        if let Err(e) = socket.close().await {
            tracing::debug!(provider = PROVIDER, error = %e, "Error closing event stream");
        }

        let superseded = token.is_cancelled() || !self.is_current(generation);
        token.cancel();

        if superseded {
            tracing::debug!(provider = PROVIDER, generation, "Event stream connection ended");
            return;
        }

        tracing::warn!(
            provider = PROVIDER,
            user_id = %self.platform_user_id,
            delay_secs = self.reconnect_delay.as_secs(),
            "Event stream lost, reconnecting"
        );
        self.reconnect_if_current(generation);
    }

    async fn handle_frame(
        &self,
        socket: &mut dyn EventSocket,
        text: &str,
        generation: u64,
    ) -> Flow {
        let message = match ServerMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(provider = PROVIDER, error = %e, "Dropping invalid event frame");
                return Flow::Continue;
            }
        };

        match message {
            ServerMessage::Dispatch(DispatchEvent::EmoteSetUpdate(update)) => {
                let active = self.identity().map(|identity| identity.emote_set_id);
                if active.as_deref() == Some(update.id.as_str()) {
                    self.apply_set_update(&update);
                } else {
                    tracing::debug!(
                        provider = PROVIDER,
                        emote_set_id = %update.id,
                        active = ?active,
                        "Dropping update for inactive emote set"
                    );
                }
                Flow::Continue
            }
            ServerMessage::Dispatch(DispatchEvent::UserUpdate(update)) => {
                match update.emote_set_change() {
                    Some(change) => self.switch_emote_set(socket, change, generation).await,
                    None => {
                        tracing::trace!(provider = PROVIDER, "User update without emote set change");
                        Flow::Continue
                    }
                }
            }
            ServerMessage::Hello { session_id } => {
                tracing::debug!(provider = PROVIDER, session_id = ?session_id, "Event stream hello");
                Flow::Continue
            }
            ServerMessage::Heartbeat => {
                tracing::trace!(provider = PROVIDER, "Event stream heartbeat");
                Flow::Continue
            }
            ServerMessage::Ack => {
                tracing::debug!(provider = PROVIDER, "Event stream ack");
                Flow::Continue
            }
            ServerMessage::Error { message } => {
                tracing::warn!(provider = PROVIDER, reason = %message, "Event stream error frame");
                Flow::Continue
            }
            ServerMessage::Reconnect => {
                tracing::info!(provider = PROVIDER, "Server requested reconnect");
                Flow::Reconnect
            }
            ServerMessage::EndOfStream => {
                tracing::info!(provider = PROVIDER, "Server ended event stream");
                Flow::Reconnect
            }
        }
    }

    fn apply_set_update(&self, update: &EmoteSetUpdate) {
        let additions: Vec<(String, String)> = update
            .added()
            .map(|emote| self.fetcher.normalize(emote))
            .collect();

        let (removed, added) = {
            let mut catalog = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
            let removed = catalog.apply_removals(update.removed_names());
            let added = catalog.apply_additions(additions);
            (removed, added)
        };

        tracing::debug!(provider = PROVIDER, removed, added, "Applied emote set update");
    }

    /// Move the subscription to a new emote set and refetch once
    async fn switch_emote_set(
        &self,
        socket: &mut dyn EventSocket,
        change: EmoteSetChange,
        generation: u64,
    ) -> Flow {
        let Some(current) = self.identity() else {
            return Flow::Continue;
        };
        if current.emote_set_id == change.new {
            tracing::debug!(
                provider = PROVIDER,
                emote_set_id = %change.new,
                "Emote set change to the active set, ignoring"
            );
            return Flow::Continue;
        }

        let messages = [
            ClientMessage::unsubscribe(SubscriptionKind::EmoteSet, &current.emote_set_id),
            ClientMessage::subscribe(SubscriptionKind::EmoteSet, &change.new),
        ];
        if let Err(e) = send_all(socket, &messages).await {
            tracing::error!(provider = PROVIDER, error = %e, "Failed to switch emote set subscription");
            return Flow::Reconnect;
        }

        tracing::info!(
            provider = PROVIDER,
            user_id = %current.user_id,
            old = %current.emote_set_id,
            new = %change.new,
            "Active emote set changed"
        );
        *lock(&self.identity) = Some(SubscriptionIdentity::new(current.user_id, change.new));

        match self.fetcher.fetch(&self.platform_user_id).await {
            Some(snapshot) if self.is_current(generation) => self.replace_catalog(snapshot.catalog),
            Some(_) => {}
            None => {
                tracing::debug!(provider = PROVIDER, "Keeping previous catalog after failed refetch");
            }
        }

        Flow::Continue
    }

    fn schedule_reconnect(self: &Arc<Self>) {
        if self.closed.is_cancelled() {
            return;
        }
        self.set_state(SyncState::Reconnecting);

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = inner.closed.cancelled() => return,
                _ = tokio::time::sleep(inner.reconnect_delay) => {}
            }
            inner.connect().await;
        });
    }

    fn reconnect_if_current(self: &Arc<Self>, generation: u64) {
        if self.is_current(generation) {
            self.schedule_reconnect();
        }
    }

    /// Supersede the previous connection and return the new generation
    fn begin_generation(&self) -> (u64, CancellationToken) {
        let token = self.closed.child_token();
        let mut connection = lock(&self.connection);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = connection.replace(token.clone()) {
            previous.cancel();
        }
        (generation, token)
    }

    /// Whether a connection task is still reading its socket
    fn has_live_connection(&self) -> bool {
        lock(&self.connection)
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn close(&self) {
        if self.closed.is_cancelled() {
            return;
        }
        self.closed.cancel();
        self.set_state(SyncState::Closed);
        tracing::info!(provider = PROVIDER, user_id = %self.platform_user_id, "Emote client closed");
    }

    fn set_state(&self, state: SyncState) {
        let mut current = lock(&self.state);
        *current = if self.closed.is_cancelled() {
            SyncState::Closed
        } else {
            state
        };
    }

    fn identity(&self) -> Option<SubscriptionIdentity> {
        lock(&self.identity).clone()
    }

    fn read_catalog(&self) -> std::sync::RwLockReadGuard<'_, Catalog> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace_catalog(&self, catalog: Catalog) {
        self.catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(catalog);
    }
}

async fn send_all(socket: &mut dyn EventSocket, messages: &[ClientMessage]) -> Result<()> {
    for message in messages {
        socket.send(message.to_json()?).await?;
    }
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
