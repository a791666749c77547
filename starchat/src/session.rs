//! Durable local key/value storage for session state.
//!
//! Each key is one JSON file in the storage directory. This is the
//! client's localStorage analogue; the keys this core touches are
//! [`SESSION_KEY`] and [`NAV_KEY`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use starchat_proto::session::Session;

/// Storage key holding the persisted auth session.
pub const SESSION_KEY: &str = "session";

/// Storage key holding the last selected navigation tab.
pub const NAV_KEY: &str = "selectedNav";

/// Error reading or writing local storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem access failed.
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    /// A stored value could not be encoded or decoded.
    #[error("storage encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// File-backed key/value store of JSON documents.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Reads and decodes the value under `key`, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on filesystem failure or if the stored
    /// document does not decode as `T`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let path = self.path(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Encodes and writes `value` under `key`, creating the storage
    /// directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on filesystem or encoding failure.
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let raw = serde_json::to_string_pretty(value)?;
        fs::write(self.path(key), raw)?;
        Ok(())
    }

    /// Removes the value under `key`; a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on filesystem failure.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// The persisted session, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the session file exists but cannot
    /// be read or decoded.
    pub fn load_session(&self) -> Result<Option<Session>, StorageError> {
        self.get_json(SESSION_KEY)
    }

    /// Persists the session.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on filesystem or encoding failure.
    pub fn save_session(&self, session: &Session) -> Result<(), StorageError> {
        self.set_json(SESSION_KEY, session)
    }

    /// The directory backing this store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
