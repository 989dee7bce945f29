//! Key-value backend persisted in a single redb file.
//!
//! Every operation is one redb write (or read) transaction, which redb
//! serializes, so version checks and the writes they guard can never
//! interleave with another caller. Transactions run on tokio's blocking pool;
//! once started they commit or abort on their own even if the awaiting
//! request is dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{Conditional, KeyValueBackend, Version, VersionedValue};
use crate::clock::{deadline_after, from_unix_millis, Clock};
use crate::constants::REDB_FILE_NAME;
use crate::error::BackendError;

/// Values (`StoredEntry`, bincode-encoded).
const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("kv_entries");
/// Backend bookkeeping (version counter).
const STATE: TableDefinition<&str, u64> = TableDefinition::new("kv_state");
const LAST_VERSION_KEY: &str = "last_version";

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    version: u64,
    expires_at_ms: Option<i64>,
    value: Vec<u8>,
}

impl StoredEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at_ms
            .and_then(from_unix_millis)
            .is_some_and(|deadline| now >= deadline)
    }

    /// Version when the entry is still live at `now`.
    fn live_version(&self, now: DateTime<Utc>) -> Option<Version> {
        (!self.is_expired(now)).then_some(Version::new(self.version))
    }
}

fn decode_entry(bytes: &[u8]) -> Result<StoredEntry, BackendError> {
    Ok(bincode::deserialize(bytes)?)
}

fn encode_entry(
    version: u64,
    expires_at: Option<DateTime<Utc>>,
    value: Vec<u8>,
) -> Result<Vec<u8>, BackendError> {
    let entry = StoredEntry {
        version,
        expires_at_ms: expires_at.map(|deadline| deadline.timestamp_millis()),
        value,
    };
    Ok(bincode::serialize(&entry)?)
}

struct Inner {
    db: redb::Database,
    clock: Arc<dyn Clock>,
}

impl Inner {
    fn load(
        txn: &redb::WriteTransaction,
        key: &str,
    ) -> Result<Option<StoredEntry>, BackendError> {
        let table = txn.open_table(ENTRIES)?;
        let entry = match table.get(key)? {
            Some(guard) => Some(decode_entry(guard.value())?),
            None => None,
        };
        Ok(entry)
    }

    fn bump_version(txn: &redb::WriteTransaction) -> Result<u64, BackendError> {
        let mut state = txn.open_table(STATE)?;
        let last = state.get(LAST_VERSION_KEY)?.map(|guard| guard.value());
        let next = last.unwrap_or(0) + 1;
        state.insert(LAST_VERSION_KEY, next)?;
        Ok(next)
    }

    fn store(
        txn: &redb::WriteTransaction,
        key: &str,
        value: Vec<u8>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), BackendError> {
        let version = Self::bump_version(txn)?;
        let encoded = encode_entry(version, expires_at, value)?;
        let mut table = txn.open_table(ENTRIES)?;
        table.insert(key, encoded.as_slice())?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<VersionedValue>, BackendError> {
        let now = self.clock.now();
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES)?;
        let Some(guard) = table.get(key)? else {
            return Ok(None);
        };
        let entry = decode_entry(guard.value())?;
        Ok(entry.live_version(now).map(|version| VersionedValue {
            value: entry.value,
            version,
        }))
    }

    fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        let now = self.clock.now();
        let write_txn = self.db.begin_write()?;
        Self::store(&write_txn, key, value, deadline_after(now, ttl))?;
        write_txn.commit()?;
        Ok(())
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: Version,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<Conditional, BackendError> {
        let now = self.clock.now();
        let write_txn = self.db.begin_write()?;
        let current = Self::load(&write_txn, key)?.and_then(|entry| entry.live_version(now));
        if current != Some(expected) {
            return Ok(Conditional::VersionMismatch);
        }
        Self::store(&write_txn, key, value, deadline_after(now, ttl))?;
        write_txn.commit()?;
        Ok(Conditional::Applied)
    }

    fn compare_and_delete(
        &self,
        key: &str,
        expected: Version,
    ) -> Result<Conditional, BackendError> {
        let now = self.clock.now();
        let write_txn = self.db.begin_write()?;
        let current = Self::load(&write_txn, key)?.and_then(|entry| entry.live_version(now));
        if current != Some(expected) {
            return Ok(Conditional::VersionMismatch);
        }
        {
            let mut table = write_txn.open_table(ENTRIES)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(Conditional::Applied)
    }

    fn delete(&self, key: &str) -> Result<bool, BackendError> {
        let now = self.clock.now();
        let write_txn = self.db.begin_write()?;
        let live = {
            let mut table = write_txn.open_table(ENTRIES)?;
            let removed = table.remove(key)?;
            match removed {
                Some(guard) => decode_entry(guard.value())?.live_version(now).is_some(),
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(live)
    }

    fn ping(&self) -> Result<(), BackendError> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(ENTRIES)?;
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize, BackendError> {
        let now = self.clock.now();
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(ENTRIES)?;
            let mut expired = Vec::new();
            for item in table.iter()? {
                let (key, value) = item?;
                match decode_entry(value.value()) {
                    Ok(entry) if entry.is_expired(now) => expired.push(key.value().to_string()),
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(
                            key = key.value(),
                            error = %err,
                            "Skipping undecodable entry during purge"
                        );
                    }
                }
            }
            for key in &expired {
                table.remove(key.as_str())?;
            }
            expired.len()
        };
        write_txn.commit()?;
        Ok(removed)
    }
}

/// redb-backed [`KeyValueBackend`].
#[derive(Clone)]
pub struct RedbBackend {
    inner: Arc<Inner>,
    closed: Arc<AtomicBool>,
    path: PathBuf,
}

impl RedbBackend {
    /// Open (or create) the store inside directory `dir`.
    ///
    /// # Arguments
    /// - `dir`: Directory that holds the redb file; created if missing.
    /// - `clock`: Clock used to evaluate record TTLs.
    ///
    /// # Returns
    /// A ready backend with its tables initialized.
    ///
    /// # Errors
    /// Returns an error if the directory or database cannot be created.
    pub fn open(dir: &str, clock: Arc<dyn Clock>) -> Result<Self, BackendError> {
        std::fs::create_dir_all(dir).map_err(|err| {
            BackendError::Unavailable(format!("failed to create data directory '{}': {}", dir, err))
        })?;
        let path = Path::new(dir).join(REDB_FILE_NAME);
        let db = redb::Database::create(&path)?;

        let write_txn = db.begin_write()?;
        write_txn.open_table(ENTRIES)?;
        write_txn.open_table(STATE)?;
        write_txn.commit()?;

        tracing::debug!(path = %path.display(), "Opened redb backend");
        Ok(Self {
            inner: Arc::new(Inner { db, clock }),
            closed: Arc::new(AtomicBool::new(false)),
            path,
        })
    }

    async fn run<T, F>(&self, op: F) -> Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> Result<T, BackendError> + Send + 'static,
    {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BackendError::Closed);
        }
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(inner.as_ref()))
            .await
            .map_err(|err| BackendError::Unavailable(format!("storage task failed: {}", err)))?
    }
}

#[async_trait]
impl KeyValueBackend for RedbBackend {
    fn kind(&self) -> &'static str {
        "redb"
    }

    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, BackendError> {
        let key = key.to_string();
        self.run(move |inner| inner.get(&key)).await
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        let key = key.to_string();
        self.run(move |inner| inner.set_with_ttl(&key, value, ttl))
            .await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Version,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<Conditional, BackendError> {
        let key = key.to_string();
        self.run(move |inner| inner.compare_and_swap(&key, expected, value, ttl))
            .await
    }

    async fn compare_and_delete(
        &self,
        key: &str,
        expected: Version,
    ) -> Result<Conditional, BackendError> {
        let key = key.to_string();
        self.run(move |inner| inner.compare_and_delete(&key, expected))
            .await
    }

    async fn delete(&self, key: &str) -> Result<bool, BackendError> {
        let key = key.to_string();
        self.run(move |inner| inner.delete(&key)).await
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.run(|inner| inner.ping()).await
    }

    async fn purge_expired(&self) -> Result<usize, BackendError> {
        self.run(|inner| inner.purge_expired()).await
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.closed.store(true, Ordering::SeqCst);
        tracing::debug!(path = %self.path.display(), "Closed redb backend");
        Ok(())
    }
}
