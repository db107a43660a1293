//! Store capability — the key/value-and-set primitives the registry needs.
//!
//! The registry never talks to a concrete database directly; it is handed
//! an `Arc<dyn Store>` so tests can substitute an in-memory fake and the
//! binary can plug in Redis. The contract is deliberately narrow: set
//! membership, a newest-first record list, and a publish channel. The
//! store guarantees per-key atomicity only — callers must not assume
//! multi-key operations are transactional.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::RegistryResult;

/// Minimal key/value-and-set store surface.
#[async_trait]
pub trait Store: Send + Sync {
    /// All members of the set at `key`. Missing key is an empty set.
    async fn members(&self, key: &str) -> RegistryResult<Vec<String>>;

    /// Add `member` to the set at `key`. Returns true if it was new.
    async fn add_member(&self, key: &str, member: &str) -> RegistryResult<bool>;

    /// Remove `member` from the set at `key`. Returns true if it existed.
    async fn remove_member(&self, key: &str, member: &str) -> RegistryResult<bool>;

    /// Push `value` onto the front of the list at `key` (newest first).
    async fn push_record(&self, key: &str, value: &str) -> RegistryResult<()>;

    /// The most recent `limit` records at `key`, newest first.
    async fn recent_records(&self, key: &str, limit: usize) -> RegistryResult<Vec<String>>;

    /// Publish `message` on `channel` for external subscribers.
    async fn publish(&self, channel: &str, message: &str) -> RegistryResult<()>;
}

/// In-memory store for tests and local experimentation.
///
/// Published messages are retained so tests can assert on the
/// notification stream.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sets: Mutex<HashMap<String, BTreeSet<String>>>,
    lists: Mutex<HashMap<String, Vec<String>>>,
    published: Mutex<Vec<(String, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages published so far, as `(channel, message)` pairs.
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn members(&self, key: &str) -> RegistryResult<Vec<String>> {
        let sets = self.sets.lock().unwrap();
        Ok(sets
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_member(&self, key: &str, member: &str) -> RegistryResult<bool> {
        let mut sets = self.sets.lock().unwrap();
        Ok(sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    async fn remove_member(&self, key: &str, member: &str) -> RegistryResult<bool> {
        let mut sets = self.sets.lock().unwrap();
        Ok(sets.get_mut(key).is_some_and(|s| s.remove(member)))
    }

    async fn push_record(&self, key: &str, value: &str) -> RegistryResult<()> {
        let mut lists = self.lists.lock().unwrap();
        lists
            .entry(key.to_string())
            .or_default()
            .insert(0, value.to_string());
        Ok(())
    }

    async fn recent_records(&self, key: &str, limit: usize) -> RegistryResult<Vec<String>> {
        let lists = self.lists.lock().unwrap();
        Ok(lists
            .get(key)
            .map(|l| l.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn publish(&self, channel: &str, message: &str) -> RegistryResult<()> {
        let mut published = self.published.lock().unwrap();
        published.push((channel.to_string(), message.to_string()));
        Ok(())
    }
}
