//! Data models for persistence and the HTTP boundary.

/// Paste record, validated input and response payloads.
pub mod paste;
