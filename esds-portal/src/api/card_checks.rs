//! Door check log
//!
//! Every scan of a card's QR code at the door is recorded by DanceCloud;
//! this lists them for the committee.

use super::ApiResult;
use crate::error::registry_error_to_app;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use shared::models::MembershipCardCheck;

/// GET /api/membership-card-checks
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<MembershipCardCheck>> {
    let checks = state
        .registry
        .list_card_checks()
        .await
        .map_err(registry_error_to_app)?;
    Ok(Json(checks))
}
