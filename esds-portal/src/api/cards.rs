//! Membership card API
//!
//! Card records live in the DanceCloud registry; this side renders them,
//! prints them and forwards reissue requests.

use super::ApiResult;
use crate::error::{ServiceError, print_error_to_app, registry_error_to_app};
use crate::issuer::{CardIssuer, IssueError, render_front_png};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use card_printer::PrintSheetRequest;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::{CardFilter, CardStatus, MembershipCard};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<CardStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ReissueRequest {
    pub reason: CardStatus,
}

#[derive(Debug, Serialize)]
pub struct ReissueResponse {
    pub card_id: String,
    pub reason: CardStatus,
    pub wallet_pass_voided: bool,
}

#[derive(Debug, Serialize)]
pub struct EmailResponse {
    pub card_id: String,
    pub email: String,
}

async fn fetch_cards(state: &AppState, filter: &CardFilter) -> Result<Vec<MembershipCard>, AppError> {
    state
        .registry
        .list_cards(filter)
        .await
        .map_err(|e| AppError::from(ServiceError::from(e)))
}

async fn find_card(state: &AppState, card_id: &str) -> Result<MembershipCard, AppError> {
    fetch_cards(state, &CardFilter::ids([card_id]))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::card_not_found(card_id))
}

/// GET /api/membership-cards?status=
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<MembershipCard>> {
    let filter = CardFilter {
        ids: None,
        status: query.status,
    };
    Ok(Json(fetch_cards(&state, &filter).await?))
}

/// GET /api/membership-cards/{card_id}/front.png
pub async fn front_png(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Response, AppError> {
    let card = find_card(&state, &card_id).await?;
    let png = render_front_png(state.renderer.clone(), card)
        .await
        .map_err(print_error_to_app)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

/// POST /api/membership-cards/printable-pdf
pub async fn printable_pdf(
    State(state): State<AppState>,
    Json(request): Json<PrintSheetRequest>,
) -> Result<Response, AppError> {
    let pdf = state
        .composer
        .compose(state.registry.as_ref(), &request)
        .await
        .map_err(print_error_to_app)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "inline; filename=\"membership_cards.pdf\"",
            ),
        ],
        pdf,
    )
        .into_response())
}

/// POST /api/membership-cards/{card_id}/reissue
///
/// Any wallet pass for the old card is voided once the registry accepts
/// the reissue.
pub async fn reissue(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
    Json(request): Json<ReissueRequest>,
) -> ApiResult<ReissueResponse> {
    if !request.reason.is_reissue_reason() {
        return Err(AppError::with_message(
            ErrorCode::ReissueReasonInvalid,
            format!(
                "Cards can only be reissued as damaged, lost or stolen (got {})",
                request.reason
            ),
        ));
    }

    let card = find_card(&state, &card_id).await?;
    state
        .registry
        .reissue_card(&card.card_id, request.reason)
        .await
        .map_err(registry_error_to_app)?;
    tracing::info!(card_id = %card.card_id, reason = %request.reason, "card reissued");

    let wallet_pass_voided = match &state.wallet {
        Some(wallet) => match wallet.void_wallet_pass_if_exists(&card).await {
            Ok(voided) => voided,
            Err(e) => {
                tracing::error!(card_id = %card.card_id, error = %e, "wallet pass not voided");
                false
            }
        },
        None => false,
    };

    Ok(Json(ReissueResponse {
        card_id: card.card_id,
        reason: request.reason,
        wallet_pass_voided,
    }))
}

/// POST /api/membership-cards/{card_id}/email
pub async fn email(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> ApiResult<EmailResponse> {
    let issuer = CardIssuer::from_state(&state).ok_or_else(|| AppError::not_configured("Email"))?;
    let card = find_card(&state, &card_id).await?;

    issuer.send_card(&card).await.map_err(|e| match e {
        IssueError::Render(err) => print_error_to_app(err),
        other => {
            tracing::error!(card_id = %card.card_id, error = %other, "membership email failed");
            AppError::new(ErrorCode::EmailFailed)
        }
    })?;

    Ok(Json(EmailResponse {
        card_id: card.card_id,
        email: card.email,
    }))
}
