//! Dual-write send path.
//!
//! Every outgoing message is submitted through two independent
//! backends: the structured REST write and a direct data-store insert.
//! There is no shared transaction; both paths are always attempted and
//! neither blocks or rolls back the other, so partial failure is an
//! expected outcome, not an error.

use std::sync::Arc;

use starchat_proto::message::{NewMessage, RoomId, ValidationError};

use crate::api::{ApiError, DirectStore, MessageApi};

/// One of the two write paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePath {
    /// The structured REST write.
    Rest,
    /// The direct data-store insert.
    DirectInsert,
}

/// Per-path result of a dual write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    /// Result of the structured REST write.
    pub rest: Result<(), ApiError>,
    /// Result of the direct data-store insert.
    pub direct: Result<(), ApiError>,
}

impl SendOutcome {
    /// Whether the compose field may be cleared.
    ///
    /// Only the REST write's success clears the compose field; the
    /// direct insert's result never affects it.
    #[must_use]
    pub const fn clears_compose(&self) -> bool {
        self.rest.is_ok()
    }

    /// The paths that failed, in fixed order.
    #[must_use]
    pub fn failed_paths(&self) -> Vec<WritePath> {
        let mut failed = Vec::new();
        if self.rest.is_err() {
            failed.push(WritePath::Rest);
        }
        if self.direct.is_err() {
            failed.push(WritePath::DirectInsert);
        }
        failed
    }

    /// Whether exactly one of the two paths failed.
    #[must_use]
    pub const fn partial_failure(&self) -> bool {
        self.rest.is_ok() != self.direct.is_ok()
    }
}

/// Submits messages through both write paths.
#[derive(Debug)]
pub struct MessageSender<M, D> {
    api: Arc<M>,
    store: Arc<D>,
}

impl<M: MessageApi, D: DirectStore> MessageSender<M, D> {
    #[must_use]
    pub const fn new(api: Arc<M>, store: Arc<D>) -> Self {
        Self { api, store }
    }

    /// Validates and submits a message through both write paths.
    ///
    /// Path failures are logged and surfaced in the [`SendOutcome`];
    /// they are never fatal.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the text is blank or oversized;
    /// nothing is submitted in that case.
    pub async fn send(
        &self,
        room: RoomId,
        text: &str,
        user_name: &str,
        full_name: &str,
    ) -> Result<SendOutcome, ValidationError> {
        let message = NewMessage {
            chat_id: room,
            text: text.to_string(),
            user_name: user_name.to_string(),
            full_name: full_name.to_string(),
        };
        message.validate()?;

        let rest = self.api.post_message(&message).await;
        if let Err(err) = &rest {
            tracing::warn!(room = %room, error = %err, "structured write failed");
        }

        let direct = self.store.insert_message(&message.direct_record()).await;
        if let Err(err) = &direct {
            tracing::warn!(room = %room, error = %err, "direct insert failed");
        }

        Ok(SendOutcome { rest, direct })
    }
}

/// The compose field backing a message input.
///
/// Holds the draft text across a failed send so the user can retry
/// without retyping.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Composer {
    text: String,
}

impl Composer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current draft.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the draft.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Clears the draft only when the outcome permits it.
    pub fn apply_outcome(&mut self, outcome: &SendOutcome) {
        if outcome.clears_compose() {
            self.text.clear();
        }
    }
}
