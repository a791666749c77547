//! `Starchat` — chat-room client core.
//!
//! Real-time message synchronization for a room-based chat client:
//! a per-room timeline merged from a push subscription and a pull
//! history fetch, a dual-write send path, a username-to-profile cache,
//! and the access gate for unverified accounts. Network collaborators
//! sit behind the traits in [`api`] and [`realtime`]; the UI observes
//! everything through event channels.

pub mod api;
pub mod config;
pub mod gate;
pub mod history;
pub mod logging;
pub mod profile;
pub mod realtime;
pub mod rest;
pub mod room;
pub mod send;
pub mod session;
pub mod store;
