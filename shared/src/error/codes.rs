//! Unified error codes for the membership portal
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Membership card errors
//! - 3xxx: Delivery errors (email, wallet passes)
//! - 4xxx: QR code errors
//! - 5xxx: Door volunteer errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, JavaScript frontend).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// Requester is not authenticated
    NotAuthenticated = 1001,
    /// Incorrect shared password
    InvalidCredentials = 1002,
    /// Login attempts exhausted for this identity
    TooManyAttempts = 1003,

    // ==================== 2xxx: Membership cards ====================
    /// Membership card not found
    CardNotFound = 2001,
    /// Print layout cannot fit any card on the page
    PrintLayoutInvalid = 2002,
    /// None of the requested cards could be resolved
    NoCardsFound = 2003,
    /// Reissue reason is not damaged, lost or stolen
    ReissueReasonInvalid = 2004,
    /// Card rendering failed
    RenderFailed = 2005,

    // ==================== 3xxx: Delivery ====================
    /// Email could not be composed or delivered
    EmailFailed = 3001,
    /// Wallet pass operation failed
    WalletPassFailed = 3002,
    /// Feature is not configured on this deployment
    FeatureNotConfigured = 3003,

    // ==================== 4xxx: QR codes ====================
    /// QR code not found
    QrCodeNotFound = 4001,
    /// QR code id already in use
    QrCodeExists = 4002,

    // ==================== 5xxx: Door volunteers ====================
    /// Team member not found in the door volunteers team
    VolunteerNotFound = 5001,
    /// DanceCloud refused to add the volunteer (unknown email, already a member)
    VolunteerRejected = 5002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
    /// Upstream service (DanceCloud, Pass2U) failed
    UpstreamError = 9004,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",

            // Auth
            ErrorCode::NotAuthenticated => "Not authenticated",
            ErrorCode::InvalidCredentials => "Incorrect password",
            ErrorCode::TooManyAttempts => "Too many login attempts",

            // Membership cards
            ErrorCode::CardNotFound => "Membership card not found",
            ErrorCode::PrintLayoutInvalid => "Print layout does not fit the page",
            ErrorCode::NoCardsFound => "None of the requested cards were found",
            ErrorCode::ReissueReasonInvalid => {
                "Cards may only be reissued when damaged, lost or stolen"
            }
            ErrorCode::RenderFailed => "Card rendering failed",

            // Delivery
            ErrorCode::EmailFailed => "Email delivery failed",
            ErrorCode::WalletPassFailed => "Wallet pass operation failed",
            ErrorCode::FeatureNotConfigured => "Feature is not configured",

            // QR codes
            ErrorCode::QrCodeNotFound => "QR code not found",
            ErrorCode::QrCodeExists => "QR code already exists",

            // Door volunteers
            ErrorCode::VolunteerNotFound => "Door volunteer not found",
            ErrorCode::VolunteerRejected => "DanceCloud rejected the volunteer",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::UpstreamError => "Upstream service error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TooManyAttempts),

            // Membership cards
            2001 => Ok(ErrorCode::CardNotFound),
            2002 => Ok(ErrorCode::PrintLayoutInvalid),
            2003 => Ok(ErrorCode::NoCardsFound),
            2004 => Ok(ErrorCode::ReissueReasonInvalid),
            2005 => Ok(ErrorCode::RenderFailed),

            // Delivery
            3001 => Ok(ErrorCode::EmailFailed),
            3002 => Ok(ErrorCode::WalletPassFailed),
            3003 => Ok(ErrorCode::FeatureNotConfigured),

            // QR codes
            4001 => Ok(ErrorCode::QrCodeNotFound),
            4002 => Ok(ErrorCode::QrCodeExists),

            // Door volunteers
            5001 => Ok(ErrorCode::VolunteerNotFound),
            5002 => Ok(ErrorCode::VolunteerRejected),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::ConfigError),
            9004 => Ok(ErrorCode::UpstreamError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
