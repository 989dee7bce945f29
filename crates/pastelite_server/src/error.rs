//! HTTP error mapping for API handlers.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pastelite_core::AppError;
use serde_json::json;

/// Error returned by API handlers.
#[derive(Debug)]
pub enum HttpError {
    /// Domain or storage failure from the core.
    App(AppError),
    /// Request body was not valid JSON at all.
    MalformedJson(String),
}

impl From<AppError> for HttpError {
    fn from(value: AppError) -> Self {
        Self::App(value)
    }
}

impl HttpError {
    /// Classify an axum JSON extractor rejection.
    ///
    /// # Arguments
    /// - `rejection`: Rejection produced while extracting the body.
    /// - `max_paste_size`: Configured content limit, reported on oversize bodies.
    pub fn from_json_rejection(rejection: JsonRejection, max_paste_size: usize) -> Self {
        match rejection {
            JsonRejection::JsonSyntaxError(err) => Self::MalformedJson(err.body_text()),
            rejection if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                Self::App(AppError::PayloadTooLarge(max_paste_size))
            }
            rejection => Self::App(AppError::BadRequest(rejection.body_text())),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            HttpError::MalformedJson(details) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid JSON", "details": details }),
            ),
            HttpError::App(AppError::BadRequest(details)) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid input", "details": details }),
            ),
            HttpError::App(err @ AppError::PayloadTooLarge(_)) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({ "error": "Payload too large", "details": err.to_string() }),
            ),
            HttpError::App(AppError::NotFound) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "Paste not found or unavailable" }),
            ),
            HttpError::App(err) => {
                tracing::error!(error = %err, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
