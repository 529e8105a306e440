//! Application state for esds-portal

use crate::auth::{AuthGate, AuthSettings, CookieSigner, LoginAttempts, MemoryStore};
use crate::config::Config;
use crate::dancecloud::{CardRegistry, DanceCloudClient, DoorVolunteerTeam, PosTeam};
use crate::db::DbService;
use crate::email::{Mailer, SmtpTransport};
use crate::pass2u::Pass2uClient;
use crate::templates::Templates;
use card_printer::{
    CardArtwork, CardRenderer, FrontFaceLayout, PdfDocumentRenderer, PrintSheetComposer,
    QrCodeEncoder, ResvgRasterizer, load_artwork,
};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const BUNDLED_FRONT: &str = include_str!("../assets/card_front.svg");
const BUNDLED_BACK: &str = include_str!("../assets/card_back.svg");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// SQLite pool (QR codes, wallet passes)
    pub pool: SqlitePool,
    pub auth: AuthGate,
    /// Login-attempt records behind `auth`, kept for periodic cleanup
    pub login_attempts: Arc<MemoryStore<LoginAttempts>>,
    pub templates: Arc<Templates>,
    pub renderer: Arc<CardRenderer>,
    pub composer: PrintSheetComposer,
    /// Upstream card registry
    pub registry: Arc<dyn CardRegistry>,
    /// Absent when no door volunteers team is configured
    pub pos_team: Option<Arc<dyn PosTeam>>,
    /// Absent when Pass2U is not configured
    pub wallet: Option<Pass2uClient>,
    /// Absent when SMTP is not configured
    pub mailer: Option<Mailer>,
}

fn artwork(path: Option<&Path>, bundled: &str) -> Result<CardArtwork, BoxError> {
    match path {
        Some(path) => Ok(load_artwork(path)?),
        None => Ok(CardArtwork::from_svg(bundled)),
    }
}

impl AppState {
    /// Build the state from configuration (opens the database)
    pub async fn new(config: Config) -> Result<Self, BoxError> {
        let db = DbService::new(&config.database_url).await?;
        let client = DanceCloudClient::new(&config.dc_api_base(), config.dc_api_token.clone())?;
        let pos_team = config.door_volunteers_team_id.clone().map(|team_id| {
            Arc::new(DoorVolunteerTeam::new(client.clone(), team_id)) as Arc<dyn PosTeam>
        });

        let mut state = Self::from_parts(config, db.pool, Arc::new(client))?;
        state.pos_team = pos_team;
        Ok(state)
    }

    /// Build the state around an existing pool and registry
    pub fn from_parts(
        config: Config,
        pool: SqlitePool,
        registry: Arc<dyn CardRegistry>,
    ) -> Result<Self, BoxError> {
        let settings = AuthSettings {
            cookie_ttl_secs: config.auth_cookie_ttl_secs,
            max_attempts: config.max_login_attempts,
            attempt_window_secs: config.login_attempt_window_secs,
        };
        let login_attempts = Arc::new(MemoryStore::new(Duration::from_secs(
            settings.attempt_window_secs,
        )));
        let auth = AuthGate::new(
            &config.ui_password,
            CookieSigner::new(&config.cookie_secret),
            login_attempts.clone(),
            settings,
        );

        let layout = FrontFaceLayout {
            qr_width: config.qr_width_mm,
            first_name_max_chars: config.name_max_chars,
            last_name_max_chars: config.name_max_chars,
            ..FrontFaceLayout::default()
        };
        let renderer = Arc::new(
            CardRenderer::new(
                artwork(config.card_front_svg.as_deref(), BUNDLED_FRONT)?,
                artwork(config.card_back_svg.as_deref(), BUNDLED_BACK)?,
                config.check_url_host.clone(),
                Arc::new(QrCodeEncoder::new(config.qr_error_correction)),
                Arc::new(ResvgRasterizer::with_font_dir(config.font_dir.as_deref())),
            )
            .with_layout(layout)
            .with_dpi(config.card_dpi),
        );
        let composer = PrintSheetComposer::new(renderer.clone(), Arc::new(PdfDocumentRenderer::new()));

        let templates = Arc::new(Templates::new()?);

        let wallet = match &config.pass2u {
            Some(p2u) => Some(Pass2uClient::new(
                p2u.clone(),
                config.check_url_host.clone(),
                pool.clone(),
            )?),
            None => None,
        };

        let mailer = match &config.smtp {
            Some(smtp) => Some(Mailer::new(
                Arc::new(SmtpTransport::new(smtp)?),
                templates.clone(),
                &smtp.mail_from,
            )?),
            None => None,
        };

        Ok(Self {
            config: Arc::new(config),
            pool,
            auth,
            login_attempts,
            templates,
            renderer,
            composer,
            registry,
            pos_team: None,
            wallet,
            mailer,
        })
    }
}
