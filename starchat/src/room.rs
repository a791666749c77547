//! Room view orchestration.
//!
//! [`RoomView`] owns the message store, the subscription forwarding
//! task, and the in-flight history fetch for the active room. A room
//! switch is atomic from the caller's perspective: the previous
//! subscription is closed before the store is reset, and the store is
//! reset before the new subscription opens, so no event of the old room
//! can land in the new timeline. Stale history batches are suppressed
//! by re-checking the active room when the fetch completes.

use std::sync::Arc;

use starchat_proto::message::{Message, RoomId};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::api::{MessageApi, ProfileApi};
use crate::history;
use crate::profile::ProfileCache;
use crate::realtime::{RealtimeProvider, RoomChannel};
use crate::store::{IngestOutcome, MessageStore};

/// Events the room view reports to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// The history batch was merged; `count` entries were appended.
    HistoryLoaded {
        /// The room the batch belongs to.
        room: RoomId,
        /// Number of entries appended after dedup.
        count: usize,
    },
    /// The history fetch failed; the timeline stays empty.
    HistoryFailed {
        /// The room the fetch was for.
        room: RoomId,
        /// Failure description.
        error: String,
    },
    /// A live event was appended to the timeline.
    Appended {
        /// The active room.
        room: RoomId,
    },
    /// The subscription could not be opened; live sync is degraded.
    FeedFailed {
        /// The room the subscription was for.
        room: RoomId,
        /// Failure description.
        error: String,
    },
    /// The subscription ended from the remote side.
    FeedClosed {
        /// The room the subscription was for.
        room: RoomId,
    },
}

const EVENT_BUFFER: usize = 256;

struct ActiveRoom {
    room: RoomId,
    close: Option<oneshot::Sender<()>>,
    feed_task: Option<JoinHandle<()>>,
    history_task: JoinHandle<()>,
}

/// Orchestrator for the active room's timeline.
pub struct RoomView<M, R, P> {
    api: Arc<M>,
    realtime: Arc<R>,
    profile_api: Arc<P>,
    store: Arc<Mutex<MessageStore>>,
    profiles: Arc<ProfileCache>,
    events: mpsc::Sender<RoomEvent>,
    active: Mutex<Option<ActiveRoom>>,
}

impl<M, R, P> RoomView<M, R, P>
where
    M: MessageApi + 'static,
    R: RealtimeProvider + 'static,
    P: ProfileApi + 'static,
{
    /// Creates an idle view and the channel its events flow through.
    #[must_use]
    pub fn new(
        api: Arc<M>,
        realtime: Arc<R>,
        profile_api: Arc<P>,
    ) -> (Self, mpsc::Receiver<RoomEvent>) {
        Self::with_event_buffer(api, realtime, profile_api, EVENT_BUFFER)
    }

    /// Like [`new`](Self::new) with an explicit event channel capacity.
    #[must_use]
    pub fn with_event_buffer(
        api: Arc<M>,
        realtime: Arc<R>,
        profile_api: Arc<P>,
        event_buffer: usize,
    ) -> (Self, mpsc::Receiver<RoomEvent>) {
        let (events, rx) = mpsc::channel(event_buffer);
        let view = Self {
            api,
            realtime,
            profile_api,
            store: Arc::new(Mutex::new(MessageStore::new())),
            profiles: Arc::new(ProfileCache::new()),
            events,
            active: Mutex::new(None),
        };
        (view, rx)
    }

    /// Snapshot of the active room's timeline, oldest first.
    pub async fn messages(&self) -> Vec<Message> {
        self.store.lock().await.messages().to_vec()
    }

    /// The currently active room, if any.
    pub async fn current_room(&self) -> Option<RoomId> {
        self.store.lock().await.room_id()
    }

    /// The profile cache warmed from history batches.
    #[must_use]
    pub fn profiles(&self) -> &Arc<ProfileCache> {
        &self.profiles
    }

    /// Switches the view to `room`.
    ///
    /// Closes the previous subscription, resets the store, opens the
    /// new subscription, and kicks off the history fetch. A failed
    /// subscription or fetch degrades the view (no live sync, empty
    /// room) and is reported as a [`RoomEvent`]; nothing panics.
    pub async fn switch_room(&self, room: RoomId) {
        let mut active = self.active.lock().await;
        Self::teardown(active.take()).await;
        self.store.lock().await.reset(room);
        tracing::debug!(room = %room, "room activated");

        let (close, feed_task) = match self.realtime.subscribe(&room.channel_name()).await {
            Ok(channel) => {
                let (close_tx, close_rx) = oneshot::channel();
                let task = tokio::spawn(Self::forward_events(
                    channel,
                    close_rx,
                    Arc::clone(&self.store),
                    self.events.clone(),
                    room,
                ));
                (Some(close_tx), Some(task))
            }
            Err(err) => {
                tracing::warn!(room = %room, error = %err, "subscription failed");
                self.emit(RoomEvent::FeedFailed {
                    room,
                    error: err.to_string(),
                });
                (None, None)
            }
        };

        let history_task = tokio::spawn(Self::load_history(
            Arc::clone(&self.api),
            Arc::clone(&self.profile_api),
            Arc::clone(&self.profiles),
            Arc::clone(&self.store),
            self.events.clone(),
            room,
        ));

        *active = Some(ActiveRoom {
            room,
            close,
            feed_task,
            history_task,
        });
    }

    /// Leaves the active room and tears down its subscription.
    pub async fn close(&self) {
        let mut active = self.active.lock().await;
        Self::teardown(active.take()).await;
        self.store.lock().await.deactivate();
    }

    async fn teardown(active: Option<ActiveRoom>) {
        let Some(mut active) = active else { return };
        tracing::debug!(room = %active.room, "room deactivated");
        active.history_task.abort();
        if let Some(close) = active.close.take() {
            let _ = close.send(());
        }
        if let Some(task) = active.feed_task.take() {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    tracing::warn!(error = %err, "feed task ended abnormally");
                }
            }
        }
    }

    async fn forward_events(
        mut channel: R::Channel,
        mut close_rx: oneshot::Receiver<()>,
        store: Arc<Mutex<MessageStore>>,
        events: mpsc::Sender<RoomEvent>,
        room: RoomId,
    ) {
        loop {
            tokio::select! {
                _ = &mut close_rx => break,
                event = channel.next_event() => match event {
                    Some(message) => {
                        let outcome = store.lock().await.ingest_live(message);
                        if outcome == IngestOutcome::Appended {
                            let _ = events.try_send(RoomEvent::Appended { room });
                        }
                    }
                    None => {
                        let _ = events.try_send(RoomEvent::FeedClosed { room });
                        break;
                    }
                },
            }
        }
        channel.unsubscribe().await;
    }

    async fn load_history(
        api: Arc<M>,
        profile_api: Arc<P>,
        profiles: Arc<ProfileCache>,
        store: Arc<Mutex<MessageStore>>,
        events: mpsc::Sender<RoomEvent>,
        room: RoomId,
    ) {
        match history::fetch_room_history(api.as_ref(), room).await {
            Ok(batch) => {
                let senders: Vec<String> = batch.iter().map(|m| m.user_name.clone()).collect();
                let count = {
                    let mut store = store.lock().await;
                    if store.room_id() != Some(room) {
                        tracing::debug!(room = %room, "stale history batch discarded");
                        return;
                    }
                    store.ingest_history(batch)
                };
                let _ = events.try_send(RoomEvent::HistoryLoaded { room, count });
                profiles.resolve_batch(profile_api.as_ref(), senders).await;
            }
            Err(err) => {
                tracing::warn!(room = %room, error = %err, "history fetch failed");
                let _ = events.try_send(RoomEvent::HistoryFailed {
                    room,
                    error: err.to_string(),
                });
            }
        }
    }

    fn emit(&self, event: RoomEvent) {
        if self.events.try_send(event).is_err() {
            tracing::warn!("room event dropped, receiver full or gone");
        }
    }
}
