//! Unified error system for the membership portal
//!
//! This module provides:
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Handler error carrying a code and a message
//! - [`ErrorBody`]: JSON body of error responses
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Membership card errors
//! - 3xxx: Delivery errors
//! - 4xxx: QR code errors
//! - 5xxx: Door volunteer errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorBody, ErrorCode};
//!
//! let err = AppError::with_message(ErrorCode::PrintLayoutInvalid, "Cards do not fit");
//! assert_eq!(err.http_status(), shared::http::StatusCode::BAD_REQUEST);
//!
//! let body = ErrorBody::from(&err);
//! assert_eq!(body.code.code(), 2002);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, ErrorBody};
