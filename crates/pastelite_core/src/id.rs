//! Paste identifier generation.

use crate::constants::DEFAULT_ID_LENGTH;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Produces candidate paste identifiers.
///
/// Implementations must be unpredictable and fixed-length; uniqueness is
/// enforced separately by [`crate::PasteStore`] through an existence check.
pub trait IdGenerator: Send + Sync {
    /// Produce a fresh candidate id.
    fn generate(&self) -> String;
}

/// Base62 ids drawn from the thread-local CSPRNG.
#[derive(Debug, Clone, Copy)]
pub struct RandomIdGenerator {
    length: usize,
}

impl RandomIdGenerator {
    /// Create a generator emitting ids of `length` characters.
    ///
    /// # Panics
    /// Panics if `length` is zero.
    pub fn new(length: usize) -> Self {
        assert!(length > 0, "paste id length must be positive");
        Self { length }
    }
}

impl Default for RandomIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_LENGTH)
    }
}

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}
