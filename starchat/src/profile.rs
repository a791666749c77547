//! Username-to-profile cache.
//!
//! Lookups are cached for the cache's lifetime, including failures: a
//! failed or empty lookup stores `None` and is never retried, so a
//! username that cannot be resolved costs exactly one request.

use std::collections::{BTreeSet, HashMap};

use futures_util::future::join_all;
use parking_lot::Mutex;
use starchat_proto::profile::Profile;

use crate::api::ProfileApi;

/// Shared cache of resolved profiles, keyed by username.
#[derive(Debug, Default)]
pub struct ProfileCache {
    entries: Mutex<HashMap<String, Option<Profile>>>,
}

impl ProfileCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached entry for a username, if one exists.
    ///
    /// `Some(None)` means the lookup already failed or found nothing.
    #[must_use]
    pub fn get(&self, username: &str) -> Option<Option<Profile>> {
        self.entries.lock().get(username).cloned()
    }

    /// Number of cached entries, failure sentinels included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Resolves a single username, consulting the cache first.
    ///
    /// Blank usernames resolve to `None` without a lookup. A failed
    /// lookup is cached as `None` and logged.
    pub async fn resolve<P: ProfileApi>(&self, api: &P, username: &str) -> Option<Profile> {
        if username.trim().is_empty() {
            return None;
        }
        if let Some(cached) = self.get(username) {
            return cached;
        }
        let resolved = match api.fetch_profile(username).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(username, error = %err, "profile lookup failed");
                None
            }
        };
        self.entries
            .lock()
            .insert(username.to_string(), resolved.clone());
        resolved
    }

    /// Resolves a batch of usernames, dispatching uncached lookups in
    /// parallel.
    ///
    /// Duplicates and blanks in the batch are dropped before dispatch,
    /// so each unresolved username costs exactly one lookup. Returns
    /// the number of lookups dispatched.
    pub async fn resolve_batch<P, I, S>(&self, api: &P, usernames: I) -> usize
    where
        P: ProfileApi,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pending: BTreeSet<String> = {
            let entries = self.entries.lock();
            usernames
                .into_iter()
                .map(Into::into)
                .filter(|name| !name.trim().is_empty() && !entries.contains_key(name))
                .collect()
        };
        if pending.is_empty() {
            return 0;
        }

        let lookups = pending.iter().map(|name| async move {
            let resolved = match api.fetch_profile(name).await {
                Ok(profile) => profile,
                Err(err) => {
                    tracing::warn!(username = %name, error = %err, "profile lookup failed");
                    None
                }
            };
            (name.clone(), resolved)
        });
        let resolved = join_all(lookups).await;

        let dispatched = resolved.len();
        let mut entries = self.entries.lock();
        for (name, profile) in resolved {
            entries.insert(name, profile);
        }
        dispatched
    }
}
