//! Card dashboard page (behind the password gate)

use crate::state::AppState;
use crate::templates;
use axum::extract::State;
use axum::response::Html;
use shared::CardStatus;
use shared::error::AppError;

const STATUSES: [CardStatus; 7] = [
    CardStatus::New,
    CardStatus::Issued,
    CardStatus::Expired,
    CardStatus::Cancelled,
    CardStatus::Damaged,
    CardStatus::Lost,
    CardStatus::Stolen,
];

/// GET|POST /
///
/// The page script talks to the `/api` routes.
pub async fn page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let context = serde_json::json!({
        "statuses": STATUSES,
        "api_base": "/api",
        "door_team": state.pos_team.is_some(),
    });
    state
        .templates
        .render(templates::DASHBOARD, &context)
        .map(Html)
        .map_err(|e| AppError::internal(format!("Failed to render dashboard: {e}")))
}
