//! Shared-password authentication: signed cookies and login throttling

pub mod gate;
pub mod middleware;
pub mod signer;
pub mod store;

pub use gate::{AuthGate, AuthSettings, LoginAttempts};
pub use middleware::{password_gate, require_cookie};
pub use signer::CookieSigner;
pub use store::MemoryStore;
