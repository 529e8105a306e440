//! `AppError` and the JSON error body it renders as

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned by portal handlers
///
/// Carries an [`ErrorCode`] (which fixes the HTTP status) and the message
/// shown to the caller. Layout errors put their full explanation in
/// `message` so the print dialog can show it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
}

impl AppError {
    /// Error with the stock message for `code`
    pub fn new(code: ErrorCode) -> Self {
        Self::with_message(code, code.message())
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Infrastructure failures get logged when turned into a response
    pub fn is_system(&self) -> bool {
        self.code.category() == ErrorCategory::System
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }

    pub fn card_not_found(card_id: &str) -> Self {
        Self::with_message(ErrorCode::CardNotFound, format!("Card {card_id} not found"))
    }

    pub fn qr_code_not_found(code_id: &str) -> Self {
        Self::with_message(
            ErrorCode::QrCodeNotFound,
            format!("QR code {code_id} not found"),
        )
    }

    /// Optional integration (SMTP, door team) missing from this deployment
    pub fn not_configured(feature: &str) -> Self {
        Self::with_message(
            ErrorCode::FeatureNotConfigured,
            format!("{feature} is not configured"),
        )
    }
}

/// JSON body of every error response: `{"code": 2002, "message": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code,
            message: err.message.clone(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if self.is_system() {
            tracing::error!(code = %self.code, message = %self.message, "System error occurred");
        }
        (self.http_status(), axum::Json(ErrorBody::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_stock_message() {
        let err = AppError::new(ErrorCode::CardNotFound);
        assert_eq!(err.message, "Membership card not found");
        assert_eq!(err.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_named_constructors() {
        let err = AppError::card_not_found("c1");
        assert_eq!(err.code, ErrorCode::CardNotFound);
        assert_eq!(err.message, "Card c1 not found");

        let err = AppError::qr_code_not_found("freshers");
        assert_eq!(err.code, ErrorCode::QrCodeNotFound);
        assert_eq!(err.message, "QR code freshers not found");

        let err = AppError::not_configured("Email");
        assert_eq!(err.http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.message, "Email is not configured");

        assert_eq!(AppError::unauthorized().code, ErrorCode::NotAuthenticated);
        assert_eq!(AppError::validation("bad").code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_only_system_errors_count_as_system() {
        assert!(AppError::database("locked").is_system());
        assert!(AppError::new(ErrorCode::UpstreamError).is_system());
        assert!(!AppError::new(ErrorCode::PrintLayoutInvalid).is_system());
        assert!(!AppError::unauthorized().is_system());
    }

    #[test]
    fn test_error_body_json() {
        let err = AppError::with_message(ErrorCode::PrintLayoutInvalid, "Cards too large");
        let json = serde_json::to_value(ErrorBody::from(&err)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "code": 2002, "message": "Cards too large" })
        );
    }

    #[tokio::test]
    async fn test_into_response_status_and_body() {
        let response = AppError::card_not_found("c9").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.code, ErrorCode::CardNotFound);
        assert_eq!(body.message, "Card c9 not found");
    }
}
