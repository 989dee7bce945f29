//! Paste lifecycle manager.
//!
//! [`PasteStore`] is the only writer of paste records. Creation reserves an
//! unused id and writes the record with a backend TTL matching `ttl_seconds`.
//! Fetching consumes one view through compare-and-swap (or compare-and-delete
//! for the final view), so concurrent readers of the same paste are serialized
//! by the backend rather than by an in-process lock.


use chrono::{DateTime, Utc};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{Conditional, KeyValueBackend, Version};
use crate::constants::{
    DEFAULT_BACKEND_TIMEOUT_MS, DEFAULT_MAX_CONSUME_ATTEMPTS, DEFAULT_MAX_ID_ATTEMPTS,
    DEFAULT_RETRY_BACKOFF_BASE_US, DEFAULT_RETRY_BACKOFF_MAX_MS, PASTE_KEY_PREFIX,
};
use crate::error::{AppError, BackendError};
use crate::id::{IdGenerator, RandomIdGenerator};
use crate::models::paste::{BackendTtl, NewPaste, Paste, PasteState};

/// Backend key holding the record for `id`.
pub fn paste_key(id: &str) -> String {
    format!("{}{}", PASTE_KEY_PREFIX, id)
}

/// Tuning knobs for [`PasteStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorePolicy {
    /// Upper bound on each individual backend call.
    pub backend_timeout: Duration,
    /// Lost races tolerated while no other consumer advances the view count.
    pub max_consume_attempts: u32,
    /// First jittered pause between consume retries; doubles per retry.
    pub retry_backoff_base: Duration,
    /// Ceiling for the consume retry pause.
    pub retry_backoff_max: Duration,
    /// Candidate ids tried before giving up on creation.
    pub max_id_attempts: u32,
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self {
            backend_timeout: Duration::from_millis(DEFAULT_BACKEND_TIMEOUT_MS),
            max_consume_attempts: DEFAULT_MAX_CONSUME_ATTEMPTS,
            retry_backoff_base: Duration::from_micros(DEFAULT_RETRY_BACKOFF_BASE_US),
            retry_backoff_max: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MAX_MS),
            max_id_attempts: DEFAULT_MAX_ID_ATTEMPTS,
        }
    }
}

/// Result of one read + conditional-write pass.
enum Attempt {
    Done(Option<Paste>),
    /// Another writer changed the record between our read and write.
    Retry {
        /// `view_count` of the record this pass read.
        seen_views: u64,
    },
}

/// Upper bound of the pause before retry number `retry`: `base * 2^retry`, capped at `max`.
fn backoff_cap(base: Duration, retry: u32, max: Duration) -> Duration {
    let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(max)
}

/// Creates pastes and serves them under their time and view limits.
#[derive(Clone)]
pub struct PasteStore {
    backend: Arc<dyn KeyValueBackend>,
    ids: Arc<dyn IdGenerator>,
    policy: StorePolicy,
}

impl PasteStore {
    /// Store with random ids and default policy.
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self::with_parts(
            backend,
            Arc::new(RandomIdGenerator::default()),
            StorePolicy::default(),
        )
    }

    /// Store with explicit id generation and policy.
    pub fn with_parts(
        backend: Arc<dyn KeyValueBackend>,
        ids: Arc<dyn IdGenerator>,
        policy: StorePolicy,
    ) -> Self {
        Self {
            backend,
            ids,
            policy,
        }
    }

    /// Persist a new paste.
    ///
    /// # Arguments
    /// - `new`: Validated creation input.
    /// - `now`: Creation instant.
    ///
    /// # Returns
    /// The id under which the paste can be fetched.
    ///
    /// # Errors
    /// - [`AppError::IdCollision`] when every candidate id is taken.
    /// - [`AppError::BackendUnavailable`] when the backend fails or times out.
    pub async fn create(&self, new: NewPaste, now: DateTime<Utc>) -> Result<String, AppError> {
        let id = self.allocate_id().await?;
        let paste = Paste::new(id, new, now);
        let bytes = serde_json::to_vec(&paste)?;
        self.call(
            self.backend
                .set_with_ttl(&paste_key(&paste.id), bytes, paste.initial_ttl()),
        )
        .await?;
        tracing::debug!(
            id = %paste.id,
            ttl_seconds = ?paste.ttl_seconds,
            max_views = ?paste.max_views,
            "Created paste"
        );
        Ok(paste.id)
    }

    /// Fetch a paste and consume one of its views.
    ///
    /// # Arguments
    /// - `id`: Paste id.
    /// - `now`: Instant used for every expiry decision in this call.
    ///
    /// # Returns
    /// `Some(paste)` carrying the post-increment `view_count` when this caller
    /// consumed a view, `None` when the paste is absent, expired, or out of
    /// views.
    ///
    /// # Errors
    /// - [`AppError::ContentionExceeded`] when the retry budget runs out.
    /// - [`AppError::BackendUnavailable`] when the backend fails or times out.
    /// - [`AppError::Serialization`] when the stored record is corrupt.
    pub async fn fetch_and_consume(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Paste>, AppError> {
        let key = paste_key(id);
        let budget = self.policy.max_consume_attempts.max(1);
        let mut passes: u32 = 0;
        let mut stalls: u32 = 0;
        let mut last_seen: Option<u64> = None;
        loop {
            passes = passes.saturating_add(1);
            let seen_views = match self.consume_once(&key, now).await? {
                Attempt::Done(outcome) => return Ok(outcome),
                Attempt::Retry { seen_views } => seen_views,
            };

            // Lost races only count against the budget while the view count stands still.
            if !last_seen.is_some_and(|previous| seen_views > previous) {
                stalls += 1;
            }
            last_seen = Some(seen_views);
            if stalls >= budget {
                tracing::warn!(id, passes, stalls, "Gave up consuming contended paste");
                return Err(AppError::ContentionExceeded {
                    id: id.to_string(),
                    attempts: passes,
                });
            }

            tracing::debug!(id, passes, stalls, "Paste changed concurrently; retrying");
            self.backoff(passes - 1).await;
        }
    }

    /// Check that the backend answers within the timeout.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.call(self.backend.ping()).await
    }

    /// Close the underlying backend.
    pub async fn close(&self) -> Result<(), AppError> {
        self.call(self.backend.close()).await
    }

    async fn consume_once(&self, key: &str, now: DateTime<Utc>) -> Result<Attempt, AppError> {
        let Some(stored) = self.call(self.backend.get(key)).await? else {
            return Ok(Attempt::Done(None));
        };
        let paste: Paste = serde_json::from_slice(&stored.value)?;
        let seen_views = paste.view_count;

        match paste.state_at(now) {
            PasteState::TimeExpired => {
                self.discard(key, stored.version, "time-expired").await;
                return Ok(Attempt::Done(None));
            }
            PasteState::ViewExhausted => {
                self.remove_exhausted(key).await;
                return Ok(Attempt::Done(None));
            }
            PasteState::Alive => {}
        }

        let consumed = Paste {
            view_count: paste.view_count + 1,
            ..paste
        };

        if consumed.is_view_exhausted() {
            let outcome = self
                .call(self.backend.compare_and_delete(key, stored.version))
                .await?;
            return Ok(match outcome {
                Conditional::Applied => {
                    tracing::debug!(id = %consumed.id, "Final view consumed; paste deleted");
                    Attempt::Done(Some(consumed))
                }
                Conditional::VersionMismatch => Attempt::Retry { seen_views },
            });
        }

        let ttl = match consumed.backend_ttl_at(now) {
            BackendTtl::Unlimited => None,
            BackendTtl::Remaining(remaining) => Some(remaining),
            BackendTtl::Elapsed => {
                self.discard(key, stored.version, "time-expired").await;
                return Ok(Attempt::Done(None));
            }
        };

        let bytes = serde_json::to_vec(&consumed)?;
        let outcome = self
            .call(
                self.backend
                    .compare_and_swap(key, stored.version, bytes, ttl),
            )
            .await?;
        Ok(match outcome {
            Conditional::Applied => Attempt::Done(Some(consumed)),
            Conditional::VersionMismatch => Attempt::Retry { seen_views },
        })
    }

    /// Best-effort conditional delete of a record the caller already treats as
    /// unavailable. A lost race or a backend failure leaves the outcome as-is.
    async fn discard(&self, key: &str, version: Version, reason: &'static str) {
        match self
            .call(self.backend.compare_and_delete(key, version))
            .await
        {
            Ok(Conditional::Applied) => tracing::debug!(key, reason, "Deleted unavailable paste"),
            Ok(Conditional::VersionMismatch) => {}
            Err(err) => {
                tracing::warn!(key, reason, error = %err, "Failed to delete unavailable paste")
            }
        }
    }

    /// Exhausted records never become fetchable again, so no version guard is needed.
    async fn remove_exhausted(&self, key: &str) {
        match self.call(self.backend.delete(key)).await {
            Ok(true) => tracing::debug!(key, "Deleted view-exhausted paste"),
            Ok(false) => {}
            Err(err) => tracing::warn!(key, error = %err, "Failed to delete view-exhausted paste"),
        }
    }

    /// Full-jitter pause before retry number `retry` (0-based).
    async fn backoff(&self, retry: u32) {
        let cap = backoff_cap(
            self.policy.retry_backoff_base,
            retry,
            self.policy.retry_backoff_max,
        );
        let cap_micros = u64::try_from(cap.as_micros()).unwrap_or(u64::MAX);
        if cap_micros == 0 {
            return;
        }
        let delay = rand::thread_rng().gen_range(0..=cap_micros);
        tokio::time::sleep(Duration::from_micros(delay)).await;
    }

    async fn allocate_id(&self) -> Result<String, AppError> {
        let attempts = self.policy.max_id_attempts.max(1);
        for attempt in 1..=attempts {
            let candidate = self.ids.generate();
            let existing = self.call(self.backend.get(&paste_key(&candidate))).await?;
            if existing.is_none() {
                return Ok(candidate);
            }
            tracing::debug!(attempt, "Generated paste id already in use");
        }
        Err(AppError::IdCollision { attempts })
    }

    async fn call<T>(
        &self,
        op: impl Future<Output = Result<T, BackendError>>,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(self.policy.backend_timeout, op).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(AppError::BackendUnavailable(format!(
                "{} backend did not respond within {:?}",
                self.backend.kind(),
                self.policy.backend_timeout
            ))),
        }
    }
}
