//! `Starchat` — wire record types for the chat-room client core.

pub mod message;
pub mod profile;
pub mod session;
pub mod wire;
