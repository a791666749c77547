//! Per-room message timeline with dual-channel deduplication.
//!
//! Messages reach the store from two independent channels: a bulk
//! history fetch and a live subscription feed. The two overlap (a
//! message posted just before a room switch can show up in both), so
//! every entry is admitted through one dedup check on its
//! [`MessageKey`]. The room check happens here too, at ingestion time,
//! so late events for a previously active room can never land in the
//! current timeline.

use std::collections::HashSet;

use starchat_proto::message::{Message, MessageKey, RoomId};

/// Result of offering a live event to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The message was new and is now the last timeline entry.
    Appended,
    /// A message with the same identity key is already present.
    Duplicate,
    /// The event belongs to a different room than the active one.
    WrongRoom,
    /// No room is active; the event was discarded.
    Inactive,
}

/// Ordered, deduplicated timeline for the active room.
///
/// Ordering is arrival order: the history batch first, then live events
/// in receipt order. Entries are never reordered by timestamp.
#[derive(Debug, Default)]
pub struct MessageStore {
    room_id: Option<RoomId>,
    timeline: Vec<Message>,
    seen: HashSet<MessageKey>,
}

impl MessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently active room, if any.
    #[must_use]
    pub const fn room_id(&self) -> Option<RoomId> {
        self.room_id
    }

    /// The current timeline, oldest entry first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.timeline
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    /// Discards the previous timeline wholesale and activates `room`.
    pub fn reset(&mut self, room: RoomId) {
        self.room_id = Some(room);
        self.timeline.clear();
        self.seen.clear();
    }

    /// Deactivates the store; subsequent events are discarded.
    pub fn deactivate(&mut self) {
        self.room_id = None;
        self.timeline.clear();
        self.seen.clear();
    }

    /// Merges a history batch into the timeline, preserving batch order.
    ///
    /// Entries for foreign rooms and entries whose identity key is
    /// already present are skipped. Returns the number of entries
    /// appended.
    pub fn ingest_history(&mut self, batch: Vec<Message>) -> usize {
        let mut appended = 0;
        for message in batch {
            if self.ingest_live(message) == IngestOutcome::Appended {
                appended += 1;
            }
        }
        appended
    }

    /// Offers a single live event to the timeline.
    ///
    /// The event's `chat_id` is compared against the store's current
    /// room, so an event raced across a room switch is discarded here
    /// no matter which subscription delivered it.
    pub fn ingest_live(&mut self, message: Message) -> IngestOutcome {
        let Some(room) = self.room_id else {
            tracing::debug!(chat_id = %message.chat_id, "discarding event, no active room");
            return IngestOutcome::Inactive;
        };
        if message.chat_id != room {
            tracing::debug!(
                chat_id = %message.chat_id,
                active = %room,
                "discarding event for foreign room"
            );
            return IngestOutcome::WrongRoom;
        }
        let key = message.key();
        if !self.seen.insert(key) {
            tracing::debug!(chat_id = %message.chat_id, "discarding duplicate message");
            return IngestOutcome::Duplicate;
        }
        self.timeline.push(message);
        IngestOutcome::Appended
    }
}
