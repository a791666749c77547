//! User profile record as returned by the profile lookup endpoint.

use serde::{Deserialize, Serialize};

/// A user profile, keyed by username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// The user's handle.
    pub username: String,
    /// The user's display name, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Avatar reference (URL or storage path), when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
}
