//! QR code tracking API
//!
//! - `GET /api/qr-codes` lists codes, newest first
//! - `POST /api/qr-codes` registers a redirect
//! - `DELETE /api/qr-codes/{code_id}` removes one
//! - `GET /qr/{code_id}` (public) counts the scan and redirects

use super::ApiResult;
use crate::db::repository::{RepoError, qr_code};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use shared::error::{AppError, ErrorCode};
use shared::models::{QrCode, QrCodeCreate};

/// GET /api/qr-codes
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<QrCode>> {
    let codes = qr_code::find_all(&state.pool).await?;
    Ok(Json(codes))
}

/// POST /api/qr-codes
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<QrCodeCreate>,
) -> Result<(StatusCode, Json<QrCode>), AppError> {
    payload.validate().map_err(AppError::validation)?;

    let code = qr_code::create(&state.pool, payload)
        .await
        .map_err(|e| match e {
            RepoError::Duplicate(msg) => AppError::with_message(ErrorCode::QrCodeExists, msg),
            other => other.into(),
        })?;
    tracing::info!(code_id = %code.code_id, target_url = %code.target_url, "QR code created");
    Ok((StatusCode::CREATED, Json(code)))
}

/// DELETE /api/qr-codes/{code_id}
pub async fn delete(
    State(state): State<AppState>,
    Path(code_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !qr_code::delete(&state.pool, &code_id).await? {
        return Err(AppError::qr_code_not_found(&code_id));
    }
    tracing::info!(code_id = %code_id, "QR code deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /qr/{code_id}
pub async fn redirect(
    State(state): State<AppState>,
    Path(code_id): Path<String>,
) -> Result<Redirect, AppError> {
    let code = qr_code::record_scan(&state.pool, &code_id)
        .await?
        .ok_or_else(|| AppError::qr_code_not_found(&code_id))?;
    tracing::debug!(code_id = %code.code_id, scans = code.scan_count, "QR code scanned");
    Ok(Redirect::temporary(&code.target_url))
}
