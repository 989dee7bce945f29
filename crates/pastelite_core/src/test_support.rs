//! Shared test-only helpers for pastelite_core.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use crate::backend::{Conditional, KeyValueBackend, Version, VersionedValue};
use crate::clock::ManualClock;
use crate::error::BackendError;
use crate::id::IdGenerator;
use crate::{MemoryBackend, RedbBackend};

/// Fixed creation instant used across store tests.
pub(crate) const T0_MS: i64 = 1_767_225_540_000;

/// Creates an isolated redb backend and returns it with its temp dir.
///
/// Keep the [`TempDir`] alive for the full test to preserve the backing file.
///
/// # Panics
/// Panics if temp-dir creation or database initialization fails.
pub(crate) fn setup_temp_redb(clock: Arc<ManualClock>) -> (Arc<RedbBackend>, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_path = temp_dir.path().join("db");
    let backend = RedbBackend::open(db_path.to_str().expect("db path"), clock).expect("redb");
    (Arc::new(backend), temp_dir)
}

pub(crate) fn memory_backend(clock: Arc<ManualClock>) -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new(clock))
}

/// Hands out a scripted id sequence, then repeats the last one.
pub(crate) struct SequenceIds {
    queue: Mutex<VecDeque<String>>,
    last: Mutex<String>,
}

impl SequenceIds {
    pub(crate) fn new(ids: &[&str]) -> Self {
        Self {
            queue: Mutex::new(ids.iter().map(|id| id.to_string()).collect()),
            last: Mutex::new(ids.last().copied().unwrap_or("fallback").to_string()),
        }
    }
}

impl IdGenerator for SequenceIds {
    fn generate(&self) -> String {
        let next = self.queue.lock().expect("queue").pop_front();
        match next {
            Some(id) => {
                *self.last.lock().expect("last") = id.clone();
                id
            }
            None => self.last.lock().expect("last").clone(),
        }
    }
}

/// Wraps a backend and perturbs selected operations.
pub(crate) struct FaultyBackend {
    pub(crate) inner: Arc<dyn KeyValueBackend>,
    /// Sleep this long before every `get`.
    pub(crate) get_delay: Option<Duration>,
    /// Report a version mismatch from every conditional write.
    pub(crate) always_conflict: bool,
    /// Fail every delete, conditional or not.
    pub(crate) failing_delete: bool,
}

impl FaultyBackend {
    pub(crate) fn wrap(inner: Arc<dyn KeyValueBackend>) -> Self {
        Self {
            inner,
            get_delay: None,
            always_conflict: false,
            failing_delete: false,
        }
    }
}

#[async_trait]
impl KeyValueBackend for FaultyBackend {
    fn kind(&self) -> &'static str {
        "faulty"
    }

    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, BackendError> {
        if let Some(delay) = self.get_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.get(key).await
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Version,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<Conditional, BackendError> {
        if self.always_conflict {
            return Ok(Conditional::VersionMismatch);
        }
        self.inner.compare_and_swap(key, expected, value, ttl).await
    }

    async fn compare_and_delete(
        &self,
        key: &str,
        expected: Version,
    ) -> Result<Conditional, BackendError> {
        if self.failing_delete {
            return Err(BackendError::Unavailable("injected delete failure".to_string()));
        }
        if self.always_conflict {
            return Ok(Conditional::VersionMismatch);
        }
        self.inner.compare_and_delete(key, expected).await
    }

    async fn delete(&self, key: &str) -> Result<bool, BackendError> {
        if self.failing_delete {
            return Err(BackendError::Unavailable("injected delete failure".to_string()));
        }
        self.inner.delete(key).await
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.inner.ping().await
    }

    async fn purge_expired(&self) -> Result<usize, BackendError> {
        self.inner.purge_expired().await
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.inner.close().await
    }
}
