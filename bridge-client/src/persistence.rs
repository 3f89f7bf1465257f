//! Persistence and access-policy collaborators.

use async_trait::async_trait;
use portal_bridge_types::{EntryError, UserEntry, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Persistence errors.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Backing storage failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Stored data could not be decoded.
    #[error("entry error: {0}")]
    Entry(#[from] EntryError),
}

/// Saves and loads persisted bridge-user entries.
///
/// How entries are laid out on disk is up to the implementation.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Store `entry`, replacing any previous entry with the same id.
    async fn save(&self, entry: &UserEntry) -> Result<(), PersistenceError>;

    /// Fetch the entry stored for `id`.
    async fn load(&self, id: &UserId) -> Result<Option<UserEntry>, PersistenceError>;
}

/// Decides whether a local identity may use the bridge.
pub trait WhitelistPolicy: Send + Sync {
    /// True if `user_id` is allowed.
    fn check(&self, user_id: &UserId) -> bool;
}

/// Entries kept in memory as JSON.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    inner: Arc<Mutex<MemoryPersistenceInner>>,
}

#[derive(Debug, Default)]
struct MemoryPersistenceInner {
    entries: HashMap<UserId, String>,
    saves: usize,
    fail_next_save: Option<String>,
}

impl MemoryPersistence {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw JSON for `id`, bypassing validation.
    pub fn insert_raw(&self, id: UserId, json: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.insert(id, json.to_string());
    }

    /// Decoded entry stored for `id`.
    pub fn stored(&self, id: &UserId) -> Option<UserEntry> {
        let inner = self.inner.lock().unwrap();
        inner
            .entries
            .get(id)
            .and_then(|json| UserEntry::from_json(json).ok())
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.saves
    }

    /// Cause the next save to fail.
    pub fn fail_next_save(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_save = Some(error.to_string());
    }
}

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn save(&self, entry: &UserEntry) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_next_save.take() {
            return Err(PersistenceError::Storage(error));
        }
        inner.entries.insert(entry.id.clone(), entry.to_json()?);
        inner.saves += 1;
        Ok(())
    }

    async fn load(&self, id: &UserId) -> Result<Option<UserEntry>, PersistenceError> {
        let inner = self.inner.lock().unwrap();
        match inner.entries.get(id) {
            Some(json) => Ok(Some(UserEntry::from_json(json)?)),
            None => Ok(None),
        }
    }
}

/// Whitelist of user ids and homeserver domains.
///
/// An entry matches a user id exactly, matches every user on a domain when
/// it equals the part after the first `:`, or matches everyone when `*`.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    entries: Vec<String>,
}

impl Whitelist {
    /// Build a whitelist from entries.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// A whitelist admitting everyone.
    pub fn allow_all() -> Self {
        Self::new(["*"])
    }
}

impl WhitelistPolicy for Whitelist {
    fn check(&self, user_id: &UserId) -> bool {
        let id = user_id.as_str();
        let domain = id.split_once(':').map(|(_, domain)| domain);
        self.entries
            .iter()
            .any(|entry| entry == "*" || entry == id || Some(entry.as_str()) == domain)
    }
}
