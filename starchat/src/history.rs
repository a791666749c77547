//! Bulk history fetch for a room.

use starchat_proto::message::{Message, RoomId};

use crate::api::{ApiError, MessageApi};

/// Error produced by a failed history fetch.
///
/// A failed fetch leaves the caller's timeline empty; there is no
/// partial merge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The underlying request failed.
    #[error("history fetch failed: {0}")]
    Api(#[from] ApiError),
}

/// Fetches the full message history of `room`, oldest first.
///
/// The backend does not guarantee an order, so the batch is sorted by
/// timestamp here (stable, so same-instant messages keep their backend
/// order).
///
/// # Errors
///
/// Returns [`FetchError`] if the request fails or the payload is
/// malformed.
pub async fn fetch_room_history<M: MessageApi>(
    api: &M,
    room: RoomId,
) -> Result<Vec<Message>, FetchError> {
    let mut batch = api.fetch_messages(room).await?;
    batch.sort_by_key(|m| m.timestamp);
    tracing::debug!(room = %room, count = batch.len(), "history fetched");
    Ok(batch)
}
