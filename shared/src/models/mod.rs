//! Data models
//!
//! Shared between the card printer and the portal service.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.

pub mod card_check;
pub mod door_volunteer;
pub mod membership_card;
pub mod qr_code;

// Re-exports
pub use card_check::*;
pub use door_volunteer::*;
pub use membership_card::*;
pub use qr_code::*;
