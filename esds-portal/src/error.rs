//! Unified service-layer error type for esds-portal
//!
//! `ServiceError` bridges infrastructure errors (`reqwest`, `sqlx`, `lettre`,
//! `BoxError`) and the API-layer error (`AppError`), so handlers can use `?`
//! without hand-written logging at every call site.

use crate::dancecloud::DanceCloudError;
use axum::response::IntoResponse;
use card_printer::PrintError;
use shared::error::{AppError, ErrorCode};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service-layer error
///
/// - `Upstream`: infrastructure errors (auto-logged, mapped to a generic code)
/// - `App`: business-rule errors (passed through to the client)
#[derive(Debug)]
pub enum ServiceError {
    /// Database, HTTP client or SMTP error
    Upstream(BoxError),
    /// Business-rule error (already an AppError with the correct ErrorCode)
    App(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Database error");
        ServiceError::App(AppError::new(ErrorCode::DatabaseError))
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        ServiceError::Upstream(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Upstream(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<PrintError> for ServiceError {
    fn from(e: PrintError) -> Self {
        ServiceError::App(print_error_to_app(e))
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Upstream(err) => {
                tracing::error!(error = %err, "Upstream service error");
                AppError::new(ErrorCode::UpstreamError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Map a card printer error onto the API error codes
///
/// Layout problems are the caller's to fix (400); a failing card source
/// is an upstream problem (502); anything else is ours (500).
pub fn print_error_to_app(e: PrintError) -> AppError {
    match e {
        PrintError::Layout(layout) => {
            AppError::with_message(ErrorCode::PrintLayoutInvalid, layout.message)
        }
        PrintError::NoCards => AppError::new(ErrorCode::NoCardsFound),
        PrintError::Source(err) => {
            tracing::error!(error = %err, "Card source failed");
            AppError::with_message(ErrorCode::UpstreamError, "Card registry unavailable")
        }
        other => {
            tracing::error!(error = %other, "Card rendering failed");
            AppError::new(ErrorCode::RenderFailed)
        }
    }
}

/// Map a card registry error onto the API error codes
pub fn registry_error_to_app(e: DanceCloudError) -> AppError {
    match e {
        DanceCloudError::InvalidReissueReason(_) => {
            AppError::with_message(ErrorCode::ReissueReasonInvalid, e.to_string())
        }
        DanceCloudError::Status { status, .. } if status == http::StatusCode::NOT_FOUND => {
            AppError::new(ErrorCode::CardNotFound)
        }
        other => {
            tracing::error!(error = %other, "Card registry request failed");
            AppError::with_message(ErrorCode::UpstreamError, "Card registry unavailable")
        }
    }
}

/// Map a door volunteers team error onto the API error codes
///
/// DanceCloud refuses unknown or duplicate emails with a 4xx; its JSON:API
/// `errors[0].detail` is passed on when present.
pub fn team_error_to_app(e: DanceCloudError) -> AppError {
    match e {
        DanceCloudError::Status { status, .. } if status == http::StatusCode::NOT_FOUND => {
            AppError::new(ErrorCode::VolunteerNotFound)
        }
        DanceCloudError::Status { status, body }
            if status.is_client_error()
                && status != http::StatusCode::UNAUTHORIZED
                && status != http::StatusCode::FORBIDDEN =>
        {
            tracing::warn!(status = %status, body = %body, "DanceCloud rejected team change");
            match json_api_error_detail(&body) {
                Some(detail) => AppError::with_message(ErrorCode::VolunteerRejected, detail),
                None => AppError::new(ErrorCode::VolunteerRejected),
            }
        }
        other => registry_error_to_app(other),
    }
}

fn json_api_error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value["errors"][0]["detail"].as_str().map(str::to_string)
}

impl From<DanceCloudError> for ServiceError {
    fn from(e: DanceCloudError) -> Self {
        ServiceError::App(registry_error_to_app(e))
    }
}
