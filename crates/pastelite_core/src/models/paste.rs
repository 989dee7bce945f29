//! Paste-related data models.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::time::Duration;

use crate::error::AppError;

/// Paste record as persisted in the backend under `paste:<id>`.
///
/// `created_at` is stored as Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paste {
    pub id: String,
    pub content: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub ttl_seconds: Option<u64>,
    pub max_views: Option<u64>,
    pub view_count: u64,
}

/// Validated creation input.
///
/// Only [`CreatePasteRequest::validate`] builds one from untrusted input; the
/// store trusts it as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaste {
    pub content: String,
    pub ttl_seconds: Option<u64>,
    pub max_views: Option<u64>,
}

/// Lifecycle state of a stored record at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteState {
    Alive,
    TimeExpired,
    ViewExhausted,
}

/// Backend TTL to attach when a record is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendTtl {
    /// No time limit on the paste.
    Unlimited,
    /// Whole seconds left, rounded up.
    Remaining(Duration),
    /// The logical expiry instant has already passed.
    Elapsed,
}

/// Request payload for creating a paste.
///
/// Limits stay raw JSON numbers so integral floats such as `60.0` are accepted.
#[derive(Debug, Deserialize)]
pub struct CreatePasteRequest {
    pub content: String,
    #[serde(default)]
    pub ttl_seconds: Option<Number>,
    #[serde(default)]
    pub max_views: Option<Number>,
}

/// Response after successfully creating a paste.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatePasteResponse {
    pub id: String,
    pub url: String,
}

/// Response for a successful fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchPasteResponse {
    pub content: String,
    pub remaining_views: Option<u64>,
    pub expires_at: Option<String>,
}

impl Paste {
    /// Build a fresh record with no views consumed.
    ///
    /// # Arguments
    /// - `id`: Identifier already reserved by the store.
    /// - `new`: Validated creation input.
    /// - `now`: Creation instant.
    ///
    /// # Returns
    /// A new [`Paste`] with `view_count == 0`.
    pub fn new(id: String, new: NewPaste, now: DateTime<Utc>) -> Self {
        Self {
            id,
            content: new.content,
            created_at: now,
            ttl_seconds: new.ttl_seconds,
            max_views: new.max_views,
            view_count: 0,
        }
    }

    /// Instant at which the paste stops being fetchable.
    ///
    /// Saturates at the latest representable instant for absurdly large TTLs.
    ///
    /// # Returns
    /// `None` when the paste has no time limit.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let ttl_seconds = self.ttl_seconds?;
        let expiry = i64::try_from(ttl_seconds)
            .ok()
            .and_then(|secs| secs.checked_mul(1000))
            .and_then(TimeDelta::try_milliseconds)
            .and_then(|ttl| self.created_at.checked_add_signed(ttl));
        Some(expiry.unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    /// Whether the time limit has passed at `now`.
    pub fn is_time_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expiry| now >= expiry)
    }

    /// Whether every allowed view has been consumed.
    pub fn is_view_exhausted(&self) -> bool {
        self.max_views
            .is_some_and(|max_views| self.view_count >= max_views)
    }

    /// Classify the record at `now`. Time expiry wins over view exhaustion.
    pub fn state_at(&self, now: DateTime<Utc>) -> PasteState {
        if self.is_time_expired(now) {
            PasteState::TimeExpired
        } else if self.is_view_exhausted() {
            PasteState::ViewExhausted
        } else {
            PasteState::Alive
        }
    }

    /// Backend TTL that keeps store-level expiry aligned with `expires_at`.
    pub fn backend_ttl_at(&self, now: DateTime<Utc>) -> BackendTtl {
        let Some(expiry) = self.expires_at() else {
            return BackendTtl::Unlimited;
        };
        let remaining_ms = (expiry - now).num_milliseconds();
        if remaining_ms <= 0 {
            return BackendTtl::Elapsed;
        }
        let remaining_secs = (remaining_ms as u64).div_ceil(1000);
        BackendTtl::Remaining(Duration::from_secs(remaining_secs))
    }

    /// Backend TTL for the initial write.
    pub fn initial_ttl(&self) -> Option<Duration> {
        self.ttl_seconds.map(Duration::from_secs)
    }
}

fn positive_limit(value: Option<Number>, field: &str) -> Result<Option<u64>, AppError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let limit = raw.as_u64().or_else(|| {
        raw.as_f64()
            .filter(|float| float.fract() == 0.0 && *float >= 1.0)
            .map(|float| float as u64)
    });
    match limit {
        Some(limit) if limit >= 1 => Ok(Some(limit)),
        _ => Err(AppError::BadRequest(format!(
            "{} must be an integer >= 1",
            field
        ))),
    }
}

impl CreatePasteRequest {
    /// Validate the request shape once at the boundary.
    ///
    /// # Returns
    /// A [`NewPaste`] ready for [`crate::PasteStore::create`].
    ///
    /// # Errors
    /// Returns [`AppError::BadRequest`] when content is blank or a limit is
    /// below one.
    pub fn validate(self) -> Result<NewPaste, AppError> {
        if self.content.trim().is_empty() {
            return Err(AppError::BadRequest(
                "content must be a non-empty string".to_string(),
            ));
        }
        let ttl_seconds = positive_limit(self.ttl_seconds, "ttl_seconds")?;
        let max_views = positive_limit(self.max_views, "max_views")?;
        Ok(NewPaste {
            content: self.content,
            ttl_seconds,
            max_views,
        })
    }
}
