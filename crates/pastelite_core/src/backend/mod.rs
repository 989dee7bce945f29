//! Key-value backend contract consumed by [`crate::PasteStore`].
//!
//! A backend stores opaque byte values under string keys, each tagged with a
//! [`Version`] that changes on every write. Conditional operations apply only
//! when the caller's version still matches, which is what serializes concurrent
//! consumers of the same paste. Records written with a TTL disappear once it
//! elapses; an expired record behaves exactly like a missing one.

/// Durable backend on redb.
pub mod durable;
/// Process-local backend.
pub mod memory;


pub use durable::RedbBackend;
pub use memory::MemoryBackend;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::{Config, StorageKind};
use crate::error::BackendError;

/// Opaque version token attached to every stored value.
///
/// Tokens are never reused for a key during a backend's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version(u64);

impl Version {
    /// Wrap a raw token.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw token value.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Value read from the backend together with its current version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub version: Version,
}

/// Outcome of a conditional write or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conditional {
    Applied,
    /// The key is absent, expired, or carries a different version.
    VersionMismatch,
}

impl Conditional {
    /// Whether the operation took effect.
    pub fn applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Storage capability used by the paste lifecycle.
///
/// Every method is one atomic step against the store.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Short backend name for logs.
    fn kind(&self) -> &'static str;

    /// Read a live value and its version.
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, BackendError>;

    /// Unconditionally store `value`, expiring after `ttl` when given.
    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError>;

    /// Replace the value only if the stored version equals `expected`.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Version,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<Conditional, BackendError>;

    /// Remove the value only if the stored version equals `expected`.
    async fn compare_and_delete(
        &self,
        key: &str,
        expected: Version,
    ) -> Result<Conditional, BackendError>;

    /// Unconditionally remove `key`.
    ///
    /// # Returns
    /// `true` when a live value was removed.
    async fn delete(&self, key: &str) -> Result<bool, BackendError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), BackendError>;

    /// Physically drop every record whose TTL has elapsed.
    ///
    /// # Returns
    /// Number of records removed.
    async fn purge_expired(&self) -> Result<usize, BackendError>;

    /// End the backend lifecycle; later calls fail with [`BackendError::Closed`].
    async fn close(&self) -> Result<(), BackendError>;
}

/// Open the backend selected by `config`.
///
/// # Arguments
/// - `config`: Loaded configuration.
/// - `clock`: Clock the backend uses to evaluate record TTLs.
///
/// # Returns
/// A shared backend handle.
///
/// # Errors
/// Returns an error when the durable store cannot be opened.
pub fn open(
    config: &Config,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn KeyValueBackend>, BackendError> {
    match config.storage {
        StorageKind::Memory => Ok(Arc::new(MemoryBackend::new(clock))),
        StorageKind::Redb => Ok(Arc::new(RedbBackend::open(&config.db_path, clock)?)),
    }
}
