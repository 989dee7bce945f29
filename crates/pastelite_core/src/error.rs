//! Application error types for core storage and domain logic.
use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Paste size exceeds maximum of {0} bytes")]
    PayloadTooLarge(usize),

    /// Not found, time-expired and view-exhausted pastes all map here.
    #[error("Not found")]
    NotFound,

    #[error("Storage backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Paste '{id}' is under contention; gave up after {attempts} attempts")]
    ContentionExceeded { id: String, attempts: u32 },

    #[error("Could not allocate an unused paste id after {attempts} attempts")]
    IdCollision { attempts: u32 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors reported by a [`crate::KeyValueBackend`].
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Unavailable(String),

    #[error("backend is closed")]
    Closed,

    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),

    #[error("record encoding error: {0}")]
    Codec(#[from] bincode::Error),
}

impl From<BackendError> for AppError {
    fn from(value: BackendError) -> Self {
        Self::BackendUnavailable(value.to_string())
    }
}

impl From<redb::DatabaseError> for BackendError {
    fn from(value: redb::DatabaseError) -> Self {
        Self::Storage(value.into())
    }
}

impl From<redb::TransactionError> for BackendError {
    fn from(value: redb::TransactionError) -> Self {
        Self::Storage(value.into())
    }
}

impl From<redb::TableError> for BackendError {
    fn from(value: redb::TableError) -> Self {
        Self::Storage(value.into())
    }
}

impl From<redb::StorageError> for BackendError {
    fn from(value: redb::StorageError) -> Self {
        Self::Storage(value.into())
    }
}

impl From<redb::CommitError> for BackendError {
    fn from(value: redb::CommitError) -> Self {
        Self::Storage(value.into())
    }
}
