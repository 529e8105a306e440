//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 1xxx: Authentication errors
/// - 2xxx: Membership card errors
/// - 3xxx: Delivery errors
/// - 4xxx: QR code errors
/// - 5xxx: Door volunteer errors
/// - 9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Authentication errors (1xxx)
    Auth,
    /// Membership card errors (2xxx)
    Card,
    /// Delivery errors (3xxx)
    Delivery,
    /// QR code errors (4xxx)
    QrCode,
    /// Door volunteer errors (5xxx)
    Door,
    /// System errors (9xxx, and anything unassigned)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Auth,
            2000..3000 => Self::Card,
            3000..4000 => Self::Delivery,
            4000..5000 => Self::QrCode,
            5000..6000 => Self::Door,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Auth => "auth",
            Self::Card => "card",
            Self::Delivery => "delivery",
            Self::QrCode => "qr_code",
            Self::Door => "door",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
