//! Shared-password auth gate with login-attempt throttling
//!
//! Every request is evaluated from scratch: a valid cookie bound to the
//! requester's identity authenticates; otherwise the requester either gets
//! the login form or is submitting a password.
//!
//! Failed submissions are tracked per identity. The first failure creates
//! a record with `max_attempts - 1` remaining, later failures decrement it
//! (floored at zero), and a successful login deletes it. A record lives for
//! the attempt window counted from its creation. While a live record is at
//! zero, submissions are refused without looking at the password.

use super::signer::CookieSigner;
use super::store::KvStore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Remaining login attempts for one identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttempts {
    pub remaining: u32,
    /// Unix seconds
    pub created_at: i64,
}

/// What the caller presented
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    /// Requester identity (network address)
    pub identity: &'a str,
    pub cookie: Option<&'a str>,
    /// Present only on a login form submission
    pub submitted_password: Option<&'a str>,
}

/// Outcome of evaluating a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// Valid cookie for this identity
    Authenticated { identity: String },
    /// No usable cookie and nothing submitted: show the login form
    ChallengeRequired,
    /// Correct password: set this cookie
    LoggedIn { identity: String, cookie: String },
    /// Wrong password, or locked out
    Rejected { attempts_remaining: u32 },
}

#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    pub cookie_ttl_secs: u64,
    pub max_attempts: u32,
    pub attempt_window_secs: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            cookie_ttl_secs: 24 * 3600,
            max_attempts: 10,
            attempt_window_secs: 4 * 3600,
        }
    }
}

#[derive(Clone)]
pub struct AuthGate {
    signer: CookieSigner,
    password_digest: [u8; 32],
    attempts: Arc<dyn KvStore<LoginAttempts>>,
    settings: AuthSettings,
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

impl AuthGate {
    pub fn new(
        password: &str,
        signer: CookieSigner,
        attempts: Arc<dyn KvStore<LoginAttempts>>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            signer,
            password_digest: digest(password),
            attempts,
            settings,
        }
    }

    /// Cookie verifies, is within the TTL and was issued to `identity`
    pub fn is_cookie_valid(&self, cookie: &str, identity: &str) -> bool {
        self.is_cookie_valid_at(cookie, identity, shared::util::now_secs())
    }

    fn is_cookie_valid_at(&self, cookie: &str, identity: &str, now: i64) -> bool {
        match self
            .signer
            .unsign_at(cookie, self.settings.cookie_ttl_secs, now)
        {
            Ok(bound) => bound == identity,
            Err(e) => {
                debug!(error = %e, "auth cookie rejected");
                false
            }
        }
    }

    /// Live attempt record for `identity`
    async fn live_attempts(&self, identity: &str, now: i64) -> Option<LoginAttempts> {
        let record = self.attempts.get(identity).await?;
        let age = now.saturating_sub(record.created_at);
        if age < 0 || age as u64 >= self.settings.attempt_window_secs {
            return None;
        }
        Some(record)
    }

    /// Attempts left before lockout (for rendering the login form)
    pub async fn attempts_remaining(&self, identity: &str) -> u32 {
        self.live_attempts(identity, shared::util::now_secs())
            .await
            .map_or(self.settings.max_attempts, |a| a.remaining)
    }

    pub async fn evaluate(&self, request: AuthRequest<'_>) -> AuthDecision {
        self.evaluate_at(request, shared::util::now_secs()).await
    }

    pub async fn evaluate_at(&self, request: AuthRequest<'_>, now: i64) -> AuthDecision {
        let identity = request.identity;

        if let Some(cookie) = request.cookie
            && self.is_cookie_valid_at(cookie, identity, now)
        {
            return AuthDecision::Authenticated {
                identity: identity.to_string(),
            };
        }

        let Some(password) = request.submitted_password else {
            return AuthDecision::ChallengeRequired;
        };

        let existing = self.live_attempts(identity, now).await;
        if let Some(record) = existing
            && record.remaining == 0
        {
            warn!(identity = %identity, "login refused, no attempts remaining");
            return AuthDecision::Rejected {
                attempts_remaining: 0,
            };
        }

        if digest(password) == self.password_digest {
            let cookie = match self.signer.sign_at(identity, now) {
                Ok(cookie) => cookie,
                Err(e) => {
                    warn!(error = %e, "failed to sign auth cookie");
                    return AuthDecision::ChallengeRequired;
                }
            };
            self.attempts.delete(identity).await;
            info!(identity = %identity, "login succeeded");
            return AuthDecision::LoggedIn {
                identity: identity.to_string(),
                cookie,
            };
        }

        let record = match existing {
            Some(record) => LoginAttempts {
                remaining: record.remaining.saturating_sub(1),
                created_at: record.created_at,
            },
            None => LoginAttempts {
                remaining: self.settings.max_attempts.saturating_sub(1),
                created_at: now,
            },
        };
        self.attempts.put(identity, record).await;
        warn!(
            identity = %identity,
            attempts_remaining = record.remaining,
            "login failed"
        );

        AuthDecision::Rejected {
            attempts_remaining: record.remaining,
        }
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
