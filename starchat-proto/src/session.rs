//! Session record persisted to durable local storage.
//!
//! The session JSON is produced by the auth collaborator and carries
//! fields this core does not interpret (tokens, expiry, provider
//! metadata). Both [`Session`] and [`SessionUser`] keep unknown fields
//! in a flattened map so that rewriting the session after admission
//! preserves everything the auth layer put there.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The persisted auth session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The signed-in user.
    pub user: SessionUser,
    /// Fields owned by the auth collaborator, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// The user portion of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// The user's handle, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// The user's email address, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Whether the account's email has been verified.
    #[serde(default)]
    pub is_verified: bool,
    /// Fields owned by the auth collaborator, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}
