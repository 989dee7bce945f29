//! Per-request helpers shared by API and page handlers.

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use pastelite_core::clock::from_unix_millis;
use pastelite_core::TEST_NOW_HEADER;

use crate::AppState;

/// Instant used for every expiry decision of one request.
///
/// In test mode a parseable `x-test-now-ms` header pins the instant;
/// otherwise the state's clock answers.
pub fn request_now(state: &AppState, headers: &HeaderMap) -> DateTime<Utc> {
    if state.config.test_mode {
        if let Some(pinned) = test_now_override(headers) {
            return pinned;
        }
    }
    state.clock.now()
}

fn test_now_override(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let raw = headers.get(TEST_NOW_HEADER)?.to_str().ok()?;
    let millis = raw.trim().parse::<i64>().ok()?;
    from_unix_millis(millis)
}

/// Shareable page URL for a paste.
///
/// Uses `public_url` when configured, otherwise the request's forwarded
/// protocol (default `http`) and `Host` header.
pub fn share_url(public_url: Option<&str>, headers: &HeaderMap, id: &str) -> String {
    if let Some(base) = public_url {
        return format!("{}/p/{}", base.trim_end_matches('/'), id);
    }
    let proto = header_str(headers, "x-forwarded-proto")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("http");
    let host = header_str(headers, header::HOST.as_str()).unwrap_or("localhost");
    format!("{}://{}/p/{}", proto, host, id)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
