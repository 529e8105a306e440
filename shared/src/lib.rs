//! Shared types for the ESDS membership portal
//!
//! Domain models used by both the card printer and the portal service,
//! plus the unified error codes and the JSON error body.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use models::{CardFilter, CardStatus, MembershipCard};
