//! Process-global environment mutation helpers.
//!
//! Config tests mutate variables such as `PORT` and `BIND` that the whole
//! process shares, so they take [`env_lock`] and restore values through
//! [`EnvGuard`].

use std::sync::{Mutex, OnceLock};

/// Return the global lock used to serialize environment mutations in tests.
pub fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Set an environment variable.
///
/// Newer toolchains mark env mutation `unsafe`; older ones do not.
#[allow(unused_unsafe)]
pub fn set_env_var(key: &str, value: &str) {
    // SAFETY: callers hold `env_lock` while tests may run in parallel.
    unsafe {
        std::env::set_var(key, value);
    }
}

/// Remove an environment variable.
#[allow(unused_unsafe)]
pub fn remove_env_var(key: &str) {
    // SAFETY: callers hold `env_lock` while tests may run in parallel.
    unsafe {
        std::env::remove_var(key);
    }
}

/// Restores an environment variable value on drop.
#[must_use = "the previous value is restored when the guard drops"]
pub struct EnvGuard {
    key: String,
    previous: Option<String>,
}

impl EnvGuard {
    /// Set `key=value` until the guard drops.
    pub fn set(key: &str, value: &str) -> Self {
        let previous = std::env::var(key).ok();
        set_env_var(key, value);
        Self {
            key: key.to_string(),
            previous,
        }
    }

    /// Unset `key` until the guard drops.
    pub fn remove(key: &str) -> Self {
        let previous = std::env::var(key).ok();
        remove_env_var(key);
        Self {
            key: key.to_string(),
            previous,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.previous.as_deref() {
            Some(previous) => set_env_var(&self.key, previous),
            None => remove_env_var(&self.key),
        }
    }
}
