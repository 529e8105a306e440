//! Portal configuration

use card_printer::QrErrorCorrection;
use std::path::PathBuf;
use std::str::FromStr;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// DanceCloud's own front end and the local dev server
const DEFAULT_CORS_ORIGINS: [&str; 2] = ["https://dancecloud.com", "http://localhost:5173"];

/// SMTP relay settings (membership emails)
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub mail_from: String,
}

/// Pass2U settings (wallet passes)
#[derive(Debug, Clone)]
pub struct Pass2uConfig {
    pub host: String,
    pub api_key: String,
    pub model_id: String,
}

/// Portal configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port
    pub http_port: u16,
    /// SQLite connection URL
    pub database_url: String,
    /// Shared UI password
    pub ui_password: String,
    /// HMAC key for auth cookies
    pub cookie_secret: String,
    /// DanceCloud base URL
    pub dc_host: String,
    pub dc_api_path: String,
    pub dc_api_token: String,
    /// Seconds between polls for new cards
    pub dc_poll_interval_secs: u64,
    /// Host encoded into card QR codes
    pub check_url_host: String,
    pub card_dpi: f32,
    pub qr_error_correction: QrErrorCorrection,
    /// QR width including quiet zone (mm)
    pub qr_width_mm: f64,
    pub name_max_chars: usize,
    /// Artwork overrides; the bundled artwork is used when unset
    pub card_front_svg: Option<PathBuf>,
    pub card_back_svg: Option<PathBuf>,
    pub font_dir: Option<PathBuf>,
    pub auth_cookie_name: String,
    pub auth_cookie_ttl_secs: u64,
    pub max_login_attempts: u32,
    pub login_attempt_window_secs: u64,
    /// Honour X-Forwarded-For (only behind a trusted proxy)
    pub trust_proxy_headers: bool,
    /// Browser origins allowed to call the API with credentials
    pub cors_origins: Vec<String>,
    /// DanceCloud team whose members may use the door POS
    pub door_volunteers_team_id: Option<String>,
    pub smtp: Option<SmtpConfig>,
    pub pass2u: Option<Pass2uConfig>,
    /// Directory for daily rolling log files
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Require a secret: must be set and non-empty.
    fn require_secret(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String, BoxError> {
        match lookup(name) {
            Some(v) if !v.trim().is_empty() => Ok(v),
            Some(_) => Err(format!("{name} must not be empty").into()),
            None => Err(format!("{name} must be set").into()),
        }
    }

    fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
        lookup(name).filter(|s| !s.trim().is_empty())
    }

    fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, BoxError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match Self::optional(lookup, name) {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|e| format!("{name}: invalid value {v:?}: {e}").into()),
            None => Ok(default),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BoxError> {
        let dc_host = Self::optional(&lookup, "DC_HOST")
            .unwrap_or_else(|| "https://esds.dancecloud.xyz".into())
            .trim_end_matches('/')
            .to_string();

        let smtp = match Self::optional(&lookup, "SMTP_PASSWORD") {
            Some(password) => {
                let username = Self::optional(&lookup, "SMTP_USERNAME")
                    .unwrap_or_else(|| "info@esds.org.uk".into());
                Some(SmtpConfig {
                    host: Self::optional(&lookup, "SMTP_HOST")
                        .unwrap_or_else(|| "smtp.gmail.com".into()),
                    mail_from: Self::optional(&lookup, "MAIL_FROM")
                        .unwrap_or_else(|| username.clone()),
                    username,
                    password,
                })
            }
            None => None,
        };

        let pass2u = match (
            Self::optional(&lookup, "PASS2U_API_KEY"),
            Self::optional(&lookup, "PASS2U_MODEL_ID"),
        ) {
            (Some(api_key), Some(model_id)) => Some(Pass2uConfig {
                host: Self::optional(&lookup, "PASS2U_HOST")
                    .unwrap_or_else(|| "https://api.pass2u.net/v2".into())
                    .trim_end_matches('/')
                    .to_string(),
                api_key,
                model_id,
            }),
            _ => None,
        };

        let cors_origins = match Self::optional(&lookup, "CORS_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(|o| o.trim().trim_end_matches('/').to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        Ok(Self {
            http_port: Self::parse_or(&lookup, "HTTP_PORT", 8080)?,
            database_url: Self::optional(&lookup, "DATABASE_URL")
                .unwrap_or_else(|| "sqlite://working/esds.db".into()),
            ui_password: Self::require_secret(&lookup, "UI_PASSWORD")?,
            cookie_secret: Self::require_secret(&lookup, "COOKIE_SECRET")?,
            check_url_host: Self::optional(&lookup, "CHECK_URL_HOST")
                .map(|h| h.trim_end_matches('/').to_string())
                .unwrap_or_else(|| dc_host.clone()),
            dc_host,
            dc_api_path: Self::optional(&lookup, "DC_API_PATH")
                .unwrap_or_else(|| "api/v1".into())
                .trim_matches('/')
                .to_string(),
            dc_api_token: Self::require_secret(&lookup, "DC_API_TOKEN")?,
            dc_poll_interval_secs: Self::parse_or(&lookup, "DC_POLL_INTERVAL_SECS", 86_400)?,
            card_dpi: Self::parse_or(&lookup, "CARD_DPI", card_printer::DEFAULT_DPI)?,
            qr_error_correction: Self::parse_or(
                &lookup,
                "QR_ERROR_CORRECTION",
                QrErrorCorrection::M,
            )?,
            qr_width_mm: Self::parse_or(&lookup, "QR_WIDTH_MM", 24.0)?,
            name_max_chars: Self::parse_or(&lookup, "NAME_MAX_CHARS", 20)?,
            card_front_svg: Self::optional(&lookup, "CARD_FRONT_SVG").map(PathBuf::from),
            card_back_svg: Self::optional(&lookup, "CARD_BACK_SVG").map(PathBuf::from),
            font_dir: Self::optional(&lookup, "FONT_DIR").map(PathBuf::from),
            auth_cookie_name: Self::optional(&lookup, "AUTH_COOKIE_NAME")
                .unwrap_or_else(|| "esds_auth".into()),
            auth_cookie_ttl_secs: Self::parse_or(&lookup, "AUTH_COOKIE_TTL_SECS", 86_400)?,
            max_login_attempts: Self::parse_or(&lookup, "MAX_LOGIN_ATTEMPTS", 10)?,
            login_attempt_window_secs: Self::parse_or(
                &lookup,
                "LOGIN_ATTEMPT_WINDOW_SECS",
                4 * 3600,
            )?,
            trust_proxy_headers: Self::parse_or(&lookup, "TRUST_PROXY_HEADERS", false)?,
            cors_origins,
            door_volunteers_team_id: Self::optional(&lookup, "DOOR_VOLUNTEERS_TEAM_ID"),
            smtp,
            pass2u,
            log_dir: Self::optional(&lookup, "LOG_DIR").map(PathBuf::from),
        })
    }

    /// DanceCloud JSON:API base, e.g. `https://host/api/v1`
    pub fn dc_api_base(&self) -> String {
        format!("{}/{}", self.dc_host, self.dc_api_path)
    }
}
