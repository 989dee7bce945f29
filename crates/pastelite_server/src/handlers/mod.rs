//! HTTP request handlers.

/// Health check endpoint.
pub mod health;
/// Server-rendered HTML pages.
pub mod page;
/// Paste API endpoints.
pub mod paste;
