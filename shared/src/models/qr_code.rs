//! QR Code Tracking Model

use serde::{Deserialize, Serialize};

/// Tracked QR code redirect
///
/// `created_at` is Unix millis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct QrCode {
    pub code_id: String,
    pub target_url: String,
    pub description: String,
    pub scan_count: i64,
    pub created_at: i64,
}

/// Create QR code payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrCodeCreate {
    pub code_id: String,
    pub target_url: String,
    #[serde(default)]
    pub description: String,
}

impl QrCodeCreate {
    /// Code ids appear in a URL path segment
    pub fn validate(&self) -> Result<(), String> {
        if self.code_id.is_empty() {
            return Err("code_id must not be empty".to_string());
        }
        if !self
            .code_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err("code_id may only contain letters, digits, '-' and '_'".to_string());
        }
        if !(self.target_url.starts_with("http://") || self.target_url.starts_with("https://")) {
            return Err("target_url must be an http(s) URL".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(code_id: &str, target_url: &str) -> QrCodeCreate {
        QrCodeCreate {
            code_id: code_id.to_string(),
            target_url: target_url.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_validate() {
        assert!(create("freshers-2026", "https://esds.org.uk").validate().is_ok());
        assert!(create("", "https://esds.org.uk").validate().is_err());
        assert!(create("a/b", "https://esds.org.uk").validate().is_err());
        assert!(create("ok", "javascript:alert(1)").validate().is_err());
    }

    #[test]
    fn test_description_defaults_to_empty() {
        let c: QrCodeCreate =
            serde_json::from_str(r#"{"code_id":"x","target_url":"https://a.b"}"#).unwrap();
        assert_eq!(c.description, "");
    }
}
