//! Process-local key-value backend.
//!
//! All state sits behind one mutex and no operation awaits while holding it,
//! so each call is atomic and finishes within a single poll. Expired entries
//! are dropped lazily on access and eagerly by [`KeyValueBackend::purge_expired`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{Conditional, KeyValueBackend, Version, VersionedValue};
use crate::clock::{deadline_after, Clock};
use crate::error::BackendError;

#[derive(Debug)]
struct Entry {
    value: Vec<u8>,
    version: Version,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, Entry>,
    last_version: u64,
}

impl MemoryState {
    fn next_version(&mut self) -> Version {
        self.last_version += 1;
        Version::new(self.last_version)
    }

    /// Version of the live entry under `key`, dropping it first if expired.
    fn live_version(&mut self, key: &str, now: DateTime<Utc>) -> Option<Version> {
        let expired = self.entries.get(key).is_some_and(|entry| entry.is_expired(now));
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.version)
    }

    fn put(&mut self, key: &str, value: Vec<u8>, expires_at: Option<DateTime<Utc>>) {
        let version = self.next_version();
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                version,
                expires_at,
            },
        );
    }
}

/// In-memory [`KeyValueBackend`].
#[derive(Debug)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    clock: Arc<dyn Clock>,
    closed: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend evaluating TTLs against `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            clock,
            closed: AtomicBool::new(false),
        }
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn stored_len(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.entries.len())
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, BackendError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BackendError::Closed);
        }
        self.state
            .lock()
            .map_err(|_| BackendError::Unavailable("memory backend lock poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, BackendError> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        if state.live_version(key, now).is_none() {
            return Ok(None);
        }
        Ok(state.entries.get(key).map(|entry| VersionedValue {
            value: entry.value.clone(),
            version: entry.version,
        }))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        state.put(key, value, deadline_after(now, ttl));
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Version,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<Conditional, BackendError> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        if state.live_version(key, now) != Some(expected) {
            return Ok(Conditional::VersionMismatch);
        }
        state.put(key, value, deadline_after(now, ttl));
        Ok(Conditional::Applied)
    }

    async fn compare_and_delete(
        &self,
        key: &str,
        expected: Version,
    ) -> Result<Conditional, BackendError> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        if state.live_version(key, now) != Some(expected) {
            return Ok(Conditional::VersionMismatch);
        }
        state.entries.remove(key);
        Ok(Conditional::Applied)
    }

    async fn delete(&self, key: &str) -> Result<bool, BackendError> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        let live = state.live_version(key, now).is_some();
        state.entries.remove(key);
        Ok(live)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.lock().map(|_| ())
    }

    async fn purge_expired(&self) -> Result<usize, BackendError> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - state.entries.len())
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
