//! Core domain library for pastelite (clock, ids, storage backends, paste lifecycle).

/// Key-value backend contract and its implementations.
pub mod backend;
/// Clock abstraction used for every expiry decision.
pub mod clock;
/// Configuration loading and defaults.
pub mod config;
/// Shared constants used across pastelite crates.
pub mod constants;
/// Process-global environment mutation helpers.
pub mod env;
/// Application error types (storage/domain).
pub mod error;
/// Paste identifier generation.
pub mod id;
/// Data models for API requests and persistence.
pub mod models;
/// Paste lifecycle manager (create, fetch-and-consume).
pub mod store;
/// Background reclamation of backend-expired records.
pub mod sweeper;
/// Response projections derived from a stored paste.
pub mod view;

#[cfg(test)]
pub(crate) mod test_support;

pub use backend::{KeyValueBackend, MemoryBackend, RedbBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use constants::*;
pub use error::{AppError, BackendError};
pub use id::{IdGenerator, RandomIdGenerator};
pub use store::{PasteStore, StorePolicy};
