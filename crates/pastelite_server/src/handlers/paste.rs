//! Paste API handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use pastelite_core::models::paste::{CreatePasteRequest, CreatePasteResponse, FetchPasteResponse};

use crate::error::HttpError;
use crate::request::{request_now, share_url};
use crate::{AppError, AppState};

/// Create a new paste.
///
/// # Arguments
/// - `state`: Application state.
/// - `headers`: Request headers (clock override, share URL host).
/// - `payload`: Paste creation payload, or the reason it failed to parse.
///
/// # Returns
/// `201` with the new id and its shareable URL.
///
/// # Errors
/// Returns an error if validation or persistence fails.
pub async fn create_paste(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreatePasteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatePasteResponse>), HttpError> {
    let Json(req) = payload.map_err(|rejection| {
        HttpError::from_json_rejection(rejection, state.config.max_paste_size)
    })?;

    if req.content.len() > state.config.max_paste_size {
        return Err(AppError::PayloadTooLarge(state.config.max_paste_size).into());
    }

    let new = req.validate()?;
    let now = request_now(&state, &headers);
    let id = state.store.create(new, now).await?;
    let url = share_url(state.config.public_url.as_deref(), &headers, &id);

    Ok((StatusCode::CREATED, Json(CreatePasteResponse { id, url })))
}

/// Fetch a paste and consume one view.
///
/// # Arguments
/// - `state`: Application state.
/// - `id`: Paste identifier from the path.
/// - `headers`: Request headers (clock override).
///
/// # Returns
/// Content, remaining views and expiry as JSON.
///
/// # Errors
/// Returns `404` when the paste is absent, expired or exhausted.
pub async fn fetch_paste(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<FetchPasteResponse>, HttpError> {
    let now = request_now(&state, &headers);
    let paste = state
        .store
        .fetch_and_consume(&id, now)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(FetchPasteResponse::from(&paste)))
}
