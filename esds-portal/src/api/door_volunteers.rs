//! Door volunteers (POS access)
//!
//! - `GET /api/door-volunteers` lists the team
//! - `POST /api/door-volunteers` adds an existing DanceCloud account by email
//! - `DELETE /api/door-volunteers/{volunteer_id}` removes a team membership
//!
//! All three answer 503 when no team is configured.

use super::ApiResult;
use crate::dancecloud::PosTeam;
use crate::error::team_error_to_app;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use shared::error::AppError;
use shared::models::{DoorVolunteer, DoorVolunteerAdd};
use std::sync::Arc;

fn team(state: &AppState) -> Result<Arc<dyn PosTeam>, AppError> {
    state
        .pos_team
        .clone()
        .ok_or_else(|| AppError::not_configured("Door volunteers team"))
}

/// GET /api/door-volunteers
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<DoorVolunteer>> {
    let volunteers = team(&state)?
        .list_volunteers()
        .await
        .map_err(team_error_to_app)?;
    Ok(Json(volunteers))
}

/// POST /api/door-volunteers
pub async fn add(
    State(state): State<AppState>,
    Json(payload): Json<DoorVolunteerAdd>,
) -> Result<StatusCode, AppError> {
    payload.validate().map_err(AppError::validation)?;
    let team = team(&state)?;

    team.add_volunteer(payload.email.trim())
        .await
        .map_err(team_error_to_app)?;
    tracing::info!(email = %payload.email.trim(), "door volunteer added");
    Ok(StatusCode::CREATED)
}

/// DELETE /api/door-volunteers/{volunteer_id}
pub async fn remove(
    State(state): State<AppState>,
    Path(volunteer_id): Path<String>,
) -> Result<StatusCode, AppError> {
    team(&state)?
        .remove_volunteer(&volunteer_id)
        .await
        .map_err(team_error_to_app)?;
    tracing::info!(volunteer_id = %volunteer_id, "door volunteer removed");
    Ok(StatusCode::NO_CONTENT)
}
