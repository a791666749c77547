//! Backend trait seams and their in-memory test doubles.
//!
//! Every network collaborator sits behind a trait so the sync core can
//! be driven end to end by the in-memory fakes in this module. The real
//! HTTP implementations live in [`crate::rest`], the realtime seam in
//! [`crate::realtime`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use starchat_proto::message::{DirectInsertRecord, Message, NewMessage, RoomId};
use starchat_proto::profile::Profile;

use crate::realtime::LoopbackHub;

/// Error produced by any backend operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The backend answered with a non-success HTTP status.
    #[error("backend returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },
    /// The request never completed (connect, timeout, transport).
    #[error("network error: {0}")]
    Network(String),
    /// The response arrived but could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
    /// The backend accepted the request but rejected the operation.
    #[error("backend rejected the operation: {0}")]
    Rejected(String),
}

/// Read and write access to the structured message endpoint.
pub trait MessageApi: Send + Sync {
    /// Fetches the full message history of a room.
    fn fetch_messages(
        &self,
        room: RoomId,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, ApiError>> + Send;

    /// Posts a message through the structured write endpoint.
    fn post_message(
        &self,
        message: &NewMessage,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;
}

/// The second, independent write path: a direct data-store insert.
pub trait DirectStore: Send + Sync {
    /// Inserts a message record directly into the `messages` collection.
    fn insert_message(
        &self,
        record: &DirectInsertRecord,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;
}

/// Username-to-profile lookup.
pub trait ProfileApi: Send + Sync {
    /// Fetches the profile for a username, `None` if no such profile.
    fn fetch_profile(
        &self,
        username: &str,
    ) -> impl std::future::Future<Output = Result<Option<Profile>, ApiError>> + Send;
}

/// Verification operations of the auth collaborator.
pub trait AuthApi: Send + Sync {
    /// Asks the auth backend to resend the verification email.
    fn resend_verification_email(
        &self,
    ) -> impl std::future::Future<Output = Result<(), ApiError>> + Send;

    /// Asks the auth backend whether the account is now verified.
    fn check_verification_status(
        &self,
    ) -> impl std::future::Future<Output = Result<bool, ApiError>> + Send;
}

/// In-memory message backend for tests.
///
/// Implements both write paths against one shared vec, assigns ids the
/// way the real backend does, and republishes structured writes on an
/// attached [`LoopbackHub`] so round-trip delivery can be exercised.
/// Failure toggles and call counters let tests script partial outages.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    messages: Mutex<Vec<Message>>,
    profiles: Mutex<HashMap<String, Profile>>,
    hub: Option<LoopbackHub>,
    next_id: AtomicI64,
    fail_fetch: AtomicBool,
    fail_rest: AtomicBool,
    fail_insert: AtomicBool,
    fail_profiles: AtomicBool,
    rest_posts: AtomicUsize,
    direct_inserts: AtomicUsize,
    profile_fetches: AtomicUsize,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that republishes structured writes on `hub`.
    #[must_use]
    pub fn with_hub(hub: LoopbackHub) -> Self {
        Self {
            hub: Some(hub),
            ..Self::default()
        }
    }

    /// Makes subsequent history fetches fail.
    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent structured writes fail with a 500.
    pub fn fail_rest(&self, fail: bool) {
        self.fail_rest.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent direct inserts fail with a 500.
    pub fn fail_insert(&self, fail: bool) {
        self.fail_insert.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent profile lookups fail.
    pub fn fail_profiles(&self, fail: bool) {
        self.fail_profiles.store(fail, Ordering::SeqCst);
    }

    /// Seeds a message directly into the history, bypassing both write
    /// paths.
    pub fn seed_message(&self, mut message: Message) {
        if message.id.is_none() {
            message.id = Some(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        }
        self.messages.lock().push(message);
    }

    /// Seeds a profile for lookup.
    pub fn seed_profile(&self, profile: Profile) {
        self.profiles.lock().insert(profile.username.clone(), profile);
    }

    /// Number of structured write attempts that reached the backend.
    #[must_use]
    pub fn rest_posts(&self) -> usize {
        self.rest_posts.load(Ordering::SeqCst)
    }

    /// Number of direct insert attempts that reached the backend.
    #[must_use]
    pub fn direct_inserts(&self) -> usize {
        self.direct_inserts.load(Ordering::SeqCst)
    }

    /// Number of profile lookups that reached the backend.
    #[must_use]
    pub fn profile_fetches(&self) -> usize {
        self.profile_fetches.load(Ordering::SeqCst)
    }

    fn assign_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl MessageApi for InMemoryBackend {
    async fn fetch_messages(&self, room: RoomId) -> Result<Vec<Message>, ApiError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ApiError::Network("injected fetch failure".to_string()));
        }
        let messages = self.messages.lock();
        Ok(messages
            .iter()
            .filter(|m| m.chat_id == room)
            .cloned()
            .collect())
    }

    async fn post_message(&self, message: &NewMessage) -> Result<(), ApiError> {
        self.rest_posts.fetch_add(1, Ordering::SeqCst);
        if self.fail_rest.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 500,
                body: "injected rest failure".to_string(),
            });
        }
        let stored = Message {
            id: Some(self.assign_id()),
            chat_id: message.chat_id,
            user_name: message.user_name.clone(),
            full_name: Some(message.full_name.clone()),
            text: message.text.clone(),
            timestamp: Utc::now(),
        };
        self.messages.lock().push(stored.clone());
        if let Some(hub) = &self.hub {
            hub.publish(stored);
        }
        Ok(())
    }
}

impl DirectStore for InMemoryBackend {
    async fn insert_message(&self, record: &DirectInsertRecord) -> Result<(), ApiError> {
        self.direct_inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 500,
                body: "injected insert failure".to_string(),
            });
        }
        let stored = Message {
            id: Some(self.assign_id()),
            chat_id: record.chat_id,
            user_name: record.user_name.clone(),
            full_name: None,
            text: record.text.clone(),
            timestamp: Utc::now(),
        };
        self.messages.lock().push(stored);
        Ok(())
    }
}

impl ProfileApi for InMemoryBackend {
    async fn fetch_profile(&self, username: &str) -> Result<Option<Profile>, ApiError> {
        self.profile_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_profiles.load(Ordering::SeqCst) {
            return Err(ApiError::Network("injected profile failure".to_string()));
        }
        Ok(self.profiles.lock().get(username).cloned())
    }
}

/// In-memory auth backend for tests.
#[derive(Debug, Default)]
pub struct StubAuthService {
    verified: AtomicBool,
    fail_resend: AtomicBool,
    fail_check: AtomicBool,
    resend_calls: AtomicUsize,
    check_calls: AtomicUsize,
}

impl StubAuthService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the account verified for subsequent status checks.
    pub fn set_verified(&self, verified: bool) {
        self.verified.store(verified, Ordering::SeqCst);
    }

    /// Makes subsequent resend requests fail.
    pub fn fail_resend(&self, fail: bool) {
        self.fail_resend.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent status checks fail.
    pub fn fail_check(&self, fail: bool) {
        self.fail_check.store(fail, Ordering::SeqCst);
    }

    /// Number of resend requests that reached the backend.
    #[must_use]
    pub fn resend_calls(&self) -> usize {
        self.resend_calls.load(Ordering::SeqCst)
    }

    /// Number of status checks that reached the backend.
    #[must_use]
    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }
}

impl AuthApi for StubAuthService {
    async fn resend_verification_email(&self) -> Result<(), ApiError> {
        self.resend_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_resend.load(Ordering::SeqCst) {
            return Err(ApiError::Network("injected resend failure".to_string()));
        }
        Ok(())
    }

    async fn check_verification_status(&self) -> Result<bool, ApiError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_check.load(Ordering::SeqCst) {
            return Err(ApiError::Network("injected check failure".to_string()));
        }
        Ok(self.verified.load(Ordering::SeqCst))
    }
}
