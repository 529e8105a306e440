//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::CardNotFound
            | Self::NoCardsFound
            | Self::QrCodeNotFound
            | Self::VolunteerNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists | Self::QrCodeExists => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,

            // 429 Too Many Requests
            Self::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,

            // 502 Bad Gateway (upstream collaborators failed)
            Self::UpstreamError | Self::WalletPassFailed | Self::EmailFailed => {
                StatusCode::BAD_GATEWAY
            }

            // 503 Service Unavailable
            Self::FeatureNotConfigured => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::Unknown
            | Self::InternalError
            | Self::DatabaseError
            | Self::ConfigError
            | Self::RenderFailed => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (validation and user-correctable input)
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::PrintLayoutInvalid
            | Self::ReissueReasonInvalid
            | Self::VolunteerRejected => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_status() {
        assert_eq!(ErrorCode::Success.http_status(), StatusCode::OK);
    }

    #[test]
    fn test_layout_error_is_user_correctable() {
        assert_eq!(
            ErrorCode::PrintLayoutInvalid.http_status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::CardNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::NoCardsFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::QrCodeNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_volunteer_status() {
        assert_eq!(
            ErrorCode::VolunteerNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErrorCode::VolunteerRejected.http_status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_auth_status() {
        assert_eq!(
            ErrorCode::NotAuthenticated.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::TooManyAttempts.http_status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_upstream_status() {
        assert_eq!(
            ErrorCode::UpstreamError.http_status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ErrorCode::InternalError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
