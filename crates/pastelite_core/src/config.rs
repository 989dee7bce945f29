//! Configuration loading from environment variables.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BACKEND_TIMEOUT_MS, DEFAULT_MAX_PASTE_SIZE, DEFAULT_PORT, DEFAULT_SWEEP_INTERVAL_SECS,
};
use crate::store::StorePolicy;

/// Which [`crate::KeyValueBackend`] the server opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    /// Durable redb file under `db_path`.
    #[default]
    Redb,
    /// Process-local map; contents vanish on restart.
    Memory,
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redb" | "disk" => Ok(Self::Redb),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redb => f.write_str("redb"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// Runtime configuration for pastelite.
#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageKind,
    pub db_path: String,
    pub port: u16,
    pub max_paste_size: usize,
    pub backend_timeout: Duration,
    /// `None` disables the background expiry sweeper.
    pub sweep_interval: Option<Duration>,
    /// Base URL for share links; derived from request headers when unset.
    pub public_url: Option<String>,
    /// Honor the `x-test-now-ms` request header.
    pub test_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageKind::default(),
            db_path: default_db_path(),
            port: DEFAULT_PORT,
            max_paste_size: DEFAULT_MAX_PASTE_SIZE,
            backend_timeout: Duration::from_millis(DEFAULT_BACKEND_TIMEOUT_MS),
            sweep_interval: Some(Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS)),
            public_url: None,
            test_mode: false,
        }
    }
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: String) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = resolve_home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path
}

fn resolve_home_dir() -> Option<PathBuf> {
    if let Ok(home) = env::var("HOME") {
        if !home.trim().is_empty() {
            return Some(PathBuf::from(home));
        }
    }

    // Windows
    if let Ok(profile) = env::var("USERPROFILE") {
        if !profile.trim().is_empty() {
            return Some(PathBuf::from(profile));
        }
    }

    std::env::current_dir().ok()
}

fn default_db_path() -> String {
    let home = resolve_home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".cache")
        .join("pastelite")
        .join("db")
        .to_string_lossy()
        .to_string()
}

/// Parse a boolean-like environment flag value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`
/// - Falsy: `0`, `false`, `no`, `off`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
///
/// # Returns
/// `Some(bool)` when the value is recognized, otherwise `None`.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read a boolean flag from the environment.
///
/// Missing or unrecognized values are treated as `false`.
pub fn env_flag_enabled(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| parse_env_flag(&value))
        .unwrap_or(false)
}

fn env_parsed<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|raw| raw.trim().parse().ok())
}

fn storage_from_env() -> StorageKind {
    match env::var("STORAGE") {
        Ok(raw) => raw.parse().unwrap_or_else(|err| {
            tracing::warn!("Invalid STORAGE='{}': {}. Falling back to redb", raw, err);
            StorageKind::Redb
        }),
        Err(_) => StorageKind::default(),
    }
}

fn public_url_from_env() -> Option<String> {
    env::var("PUBLIC_URL")
        .ok()
        .map(|raw| raw.trim().trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing
    /// or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            storage: storage_from_env(),
            db_path: env::var("DB_PATH")
                .map(expand_tilde)
                .unwrap_or(defaults.db_path),
            port: env_parsed("PORT").unwrap_or(defaults.port),
            max_paste_size: env_parsed("MAX_PASTE_SIZE").unwrap_or(defaults.max_paste_size),
            backend_timeout: env_parsed::<u64>("BACKEND_TIMEOUT_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.backend_timeout),
            sweep_interval: match env_parsed::<u64>("SWEEP_INTERVAL_SECS") {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.sweep_interval,
            },
            public_url: public_url_from_env(),
            test_mode: env_flag_enabled("TEST_MODE"),
        }
    }

    /// Store tuning derived from this configuration.
    pub fn store_policy(&self) -> StorePolicy {
        StorePolicy {
            backend_timeout: self.backend_timeout,
            ..StorePolicy::default()
        }
    }
}
