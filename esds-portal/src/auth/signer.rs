//! Timestamped HMAC cookie signing
//!
//! Token format: `{value}.{unix_secs}.{hex hmac-sha256(value.unix_secs)}`.
//! The value may itself contain dots (IPv4 addresses do); the timestamp
//! and signature are split off from the right.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Why a token was refused
///
/// Callers treat every variant the same way ("invalid cookie").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("malformed token")]
    Malformed,
    #[error("signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid signing key")]
    Key,
}

/// Signs and verifies timestamped values
#[derive(Clone)]
pub struct CookieSigner {
    secret: Vec<u8>,
}

impl CookieSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, payload: &str) -> Result<HmacSha256, SignatureError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| SignatureError::Key)?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }

    /// Sign `value` as of `timestamp` (unix seconds)
    pub fn sign_at(&self, value: &str, timestamp: i64) -> Result<String, SignatureError> {
        let payload = format!("{}.{}", value, timestamp);
        let signature = hex::encode(self.mac(&payload)?.finalize().into_bytes());
        Ok(format!("{}.{}", payload, signature))
    }

    /// Verify `token` and return the signed value if it is at most
    /// `max_age_secs` old at `now`
    pub fn unsign_at(
        &self,
        token: &str,
        max_age_secs: u64,
        now: i64,
    ) -> Result<String, SignatureError> {
        let mut parts = token.rsplitn(3, '.');
        let (Some(signature), Some(timestamp), Some(value)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(SignatureError::Malformed);
        };

        let signature = hex::decode(signature).map_err(|_| SignatureError::Malformed)?;
        self.mac(&format!("{}.{}", value, timestamp))?
            .verify_slice(&signature)
            .map_err(|_| SignatureError::BadSignature)?;

        let timestamp: i64 = timestamp.parse().map_err(|_| SignatureError::Malformed)?;
        let age = now - timestamp;
        if age < 0 || age as u64 > max_age_secs {
            return Err(SignatureError::Expired);
        }

        Ok(value.to_string())
    }
}

impl std::fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSigner").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000;

    #[test]
    fn test_sign_unsign() {
        let signer = CookieSigner::new("secret");
        let token = signer.sign_at("192.168.1.20", NOW).unwrap();
        assert!(token.starts_with("192.168.1.20.1760000000."));
        assert_eq!(
            signer.unsign_at(&token, 60, NOW + 60).unwrap(),
            "192.168.1.20"
        );
    }

    #[test]
    fn test_ipv6_identity() {
        let signer = CookieSigner::new("secret");
        let token = signer.sign_at("2001:db8::1", NOW).unwrap();
        assert_eq!(signer.unsign_at(&token, 60, NOW).unwrap(), "2001:db8::1");
    }

    #[test]
    fn test_expired() {
        let signer = CookieSigner::new("secret");
        let token = signer.sign_at("10.0.0.1", NOW).unwrap();
        assert_eq!(
            signer.unsign_at(&token, 60, NOW + 61),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn test_future_timestamp_rejected() {
        let signer = CookieSigner::new("secret");
        let token = signer.sign_at("10.0.0.1", NOW + 3600).unwrap();
        assert_eq!(
            signer.unsign_at(&token, 86_400, NOW),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn test_tampered_value() {
        let signer = CookieSigner::new("secret");
        let token = signer.sign_at("10.0.0.1", NOW).unwrap();
        let forged = token.replacen("10.0.0.1", "10.0.0.2", 1);
        assert_eq!(
            signer.unsign_at(&forged, 60, NOW),
            Err(SignatureError::BadSignature)
        );
    }

    #[test]
    fn test_tampered_timestamp() {
        let signer = CookieSigner::new("secret");
        let token = signer.sign_at("10.0.0.1", NOW).unwrap();
        let forged = token.replacen(".1760000000.", ".1760000500.", 1);
        assert_eq!(
            signer.unsign_at(&forged, 60, NOW + 500),
            Err(SignatureError::BadSignature)
        );
    }

    #[test]
    fn test_wrong_key() {
        let token = CookieSigner::new("secret").sign_at("10.0.0.1", NOW).unwrap();
        assert_eq!(
            CookieSigner::new("other").unsign_at(&token, 60, NOW),
            Err(SignatureError::BadSignature)
        );
    }

    #[test]
    fn test_malformed() {
        let signer = CookieSigner::new("secret");
        assert_eq!(signer.unsign_at("", 60, NOW), Err(SignatureError::Malformed));
        assert_eq!(
            signer.unsign_at("nodots", 60, NOW),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            signer.unsign_at("a.1.zz", 60, NOW),
            Err(SignatureError::Malformed)
        );
    }
}
