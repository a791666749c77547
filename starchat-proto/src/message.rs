//! Message record types shared by every component of the client core.
//!
//! All types in this module mirror the backend's JSON field names
//! (`chat_id`, `user_name`, `message_text`, ...) via serde renames, so
//! they deserialize directly from both the REST history payload and the
//! realtime insert-event payload. Shape is validated here, at the
//! ingestion boundary, rather than re-checked at every use site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum allowed message body size in bytes (8 KB).
pub const MAX_MESSAGE_LEN: usize = 8 * 1024;

/// Integer identifier for a chat room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub i64);

impl RoomId {
    /// Name of the realtime channel carrying this room's insert events.
    #[must_use]
    pub fn channel_name(&self) -> String {
        format!("room.{}", self.0)
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message as read back from the backend.
///
/// `id` is assigned by the backend and may be absent on history
/// projections that do not select it. `full_name` is only guaranteed at
/// submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Backend-assigned stable identifier, when the projection includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// The room this message belongs to.
    pub chat_id: RoomId,
    /// Sender's handle.
    pub user_name: String,
    /// Sender's display name; not guaranteed on read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Message body.
    #[serde(rename = "message_text")]
    pub text: String,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Identity key used for timeline deduplication.
    ///
    /// Messages are unique by `id` when present; otherwise the triple
    /// (`chat_id`, `timestamp`, `user_name`) serves as a fallback
    /// identity.
    #[must_use]
    pub fn key(&self) -> MessageKey {
        self.id.map_or_else(
            || MessageKey::Composite {
                chat_id: self.chat_id,
                timestamp_ms: self.timestamp.timestamp_millis(),
                user_name: self.user_name.clone(),
            },
            MessageKey::Id,
        )
    }
}

/// Deduplication identity of a [`Message`] within a room timeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Backend-assigned id.
    Id(i64),
    /// Fallback identity for entries without an id.
    Composite {
        /// Room the message belongs to.
        chat_id: RoomId,
        /// Creation time, millisecond precision.
        timestamp_ms: i64,
        /// Sender's handle.
        user_name: String,
    },
}

/// Error returned when an outgoing message fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Message body is empty (after trimming).
    #[error("message text is empty")]
    Empty,
    /// Message body exceeds the maximum allowed size.
    #[error("message too large ({size} bytes, max {max} bytes)")]
    TooLarge {
        /// Actual size of the body in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },
}

/// Body of the structured REST write (`POST /messages/__one`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    /// The room to post into.
    pub chat_id: RoomId,
    /// Message body.
    #[serde(rename = "message_text")]
    pub text: String,
    /// Sender's handle.
    pub user_name: String,
    /// Sender's display name, captured at submission time.
    pub full_name: String,
}

impl NewMessage {
    /// Validates this message for sending.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Empty`] if the body is blank, or
    /// [`ValidationError::TooLarge`] if it exceeds [`MAX_MESSAGE_LEN`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::Empty);
        }
        let size = self.text.len();
        if size > MAX_MESSAGE_LEN {
            return Err(ValidationError::TooLarge {
                size,
                max: MAX_MESSAGE_LEN,
            });
        }
        Ok(())
    }

    /// The record submitted through the direct data-store path.
    ///
    /// The direct path carries no `full_name`; the two backends store
    /// different projections of the same logical message.
    #[must_use]
    pub fn direct_record(&self) -> DirectInsertRecord {
        DirectInsertRecord {
            chat_id: self.chat_id,
            text: self.text.clone(),
            user_name: self.user_name.clone(),
        }
    }
}

/// Body of the direct data-store insert into the `messages` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectInsertRecord {
    /// The room to post into.
    pub chat_id: RoomId,
    /// Message body.
    #[serde(rename = "message_text")]
    pub text: String,
    /// Sender's handle.
    pub user_name: String,
}
