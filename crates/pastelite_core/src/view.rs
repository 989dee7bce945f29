//! Pure projections from a stored paste to what responses show.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::paste::{FetchPasteResponse, Paste};

/// Views left after the current one.
///
/// # Returns
/// `None` when the paste has no view limit.
pub fn remaining_views(paste: &Paste) -> Option<u64> {
    paste
        .max_views
        .map(|max_views| max_views.saturating_sub(paste.view_count))
}

/// Absolute instant at which the paste expires.
///
/// # Returns
/// `None` when the paste has no time limit.
pub fn expiry_timestamp(paste: &Paste) -> Option<DateTime<Utc>> {
    paste.expires_at()
}

/// Render an instant as ISO-8601 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl From<&Paste> for FetchPasteResponse {
    fn from(value: &Paste) -> Self {
        Self {
            content: value.content.clone(),
            remaining_views: remaining_views(value),
            expires_at: expiry_timestamp(value).map(format_timestamp),
        }
    }
}
