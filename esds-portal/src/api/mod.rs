//! HTTP routes for esds-portal

pub mod card_checks;
pub mod cards;
pub mod dashboard;
pub mod door_volunteers;
pub mod health;
pub mod qr_codes;

use crate::auth::{password_gate, require_cookie};
use crate::state::AppState;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use axum::{Json, Router, middleware};
use shared::error::AppError;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// JSON handler result
pub type ApiResult<T> = Result<Json<T>, AppError>;

/// CORS for the configured browser origins, cookies included
///
/// Credentialed CORS cannot use wildcards, so methods and headers mirror
/// the preflight request.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "invalid CORS origin ignored");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    // Card, QR and door management (auth cookie required)
    let api = Router::new()
        .route("/membership-cards", get(cards::list))
        .route("/membership-cards/printable-pdf", post(cards::printable_pdf))
        .route("/membership-cards/{card_id}/front.png", get(cards::front_png))
        .route("/membership-cards/{card_id}/reissue", post(cards::reissue))
        .route("/membership-cards/{card_id}/email", post(cards::email))
        .route("/qr-codes", get(qr_codes::list).post(qr_codes::create))
        .route("/qr-codes/{code_id}", delete(qr_codes::delete))
        .route("/membership-card-checks", get(card_checks::list))
        .route(
            "/door-volunteers",
            get(door_volunteers::list).post(door_volunteers::add),
        )
        .route(
            "/door-volunteers/{volunteer_id}",
            delete(door_volunteers::remove),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_cookie,
        ));

    // Dashboard (login form until authenticated)
    let pages = Router::new()
        .route("/", get(dashboard::page).post(dashboard::page))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            password_gate,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/qr/{code_id}", get(qr_codes::redirect))
        .merge(pages)
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
