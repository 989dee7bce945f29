//! Shared constants used across pastelite crates.

/// Default API port.
pub const DEFAULT_PORT: u16 = 38411;

/// Default maximum paste size accepted by the API layer.
pub const DEFAULT_MAX_PASTE_SIZE: usize = 10 * 1024 * 1024;

/// Default per-call backend timeout in milliseconds.
pub const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 2_000;

/// Default interval between active expiry sweeps, in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Length of generated paste ids.
pub const DEFAULT_ID_LENGTH: usize = 10;

/// Lost races a single fetch-and-consume tolerates without observing progress.
pub const DEFAULT_MAX_CONSUME_ATTEMPTS: u32 = 16;

/// First jittered pause between consume retries, in microseconds.
pub const DEFAULT_RETRY_BACKOFF_BASE_US: u64 = 500;

/// Longest pause between consume retries, in milliseconds.
pub const DEFAULT_RETRY_BACKOFF_MAX_MS: u64 = 20;

/// Upper bound on fresh id candidates tried by a single create.
pub const DEFAULT_MAX_ID_ATTEMPTS: u32 = 5;

/// Namespace prefix for paste records in the key-value backend.
pub const PASTE_KEY_PREFIX: &str = "paste:";

/// File name for the redb database within the configured DB directory.
pub const REDB_FILE_NAME: &str = "pastes.redb";

/// Request header carrying the test-mode clock override (Unix milliseconds).
pub const TEST_NOW_HEADER: &str = "x-test-now-ms";

/// Default base URL for CLI/API clients.
pub const DEFAULT_CLI_SERVER_URL: &str = "http://localhost:38411";
