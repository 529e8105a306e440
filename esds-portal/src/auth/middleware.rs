//! Axum middleware around the auth gate
//!
//! - `password_gate`: HTML pages; shows the login form until the
//!   requester logs in, then lets requests through on the cookie.
//! - `require_cookie`: JSON API; 401 unless the cookie is valid.

use super::gate::{AuthDecision, AuthRequest};
use crate::state::AppState;
use crate::templates;
use axum::Form;
use axum::extract::{ConnectInfo, FromRequest, Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use shared::error::AppError;
use std::net::SocketAddr;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
}

/// Requester identity: the peer IP
///
/// The first `X-Forwarded-For` entry is used instead only when the
/// deployment sits behind a proxy that sets it.
pub fn client_identity(request: &Request, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers
        && let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
        && let Some(first) = val.split(',').next()
        && !first.trim().is_empty()
    {
        return first.trim().to_string();
    }

    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// Value of cookie `name`, if the request carries it
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

fn login_page(
    state: &AppState,
    status: StatusCode,
    action: &str,
    error: Option<&str>,
    attempts_remaining: u32,
) -> Response {
    let context = serde_json::json!({
        "action": action,
        "error": error,
        "attempts_remaining": attempts_remaining,
        "locked": attempts_remaining == 0,
    });
    match state.templates.render(templates::LOGIN, &context) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => AppError::internal(format!("Failed to render login page: {e}")).into_response(),
    }
}

fn login_redirect(state: &AppState, action: &str, cookie: &str) -> Response {
    let set_cookie = format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; Secure; SameSite=Strict",
        state.config.auth_cookie_name, cookie, state.config.auth_cookie_ttl_secs
    );
    match HeaderValue::from_str(&set_cookie) {
        Ok(value) => {
            let mut response = Redirect::to(action).into_response();
            response.headers_mut().insert(header::SET_COOKIE, value);
            response
        }
        Err(e) => AppError::internal(format!("Invalid auth cookie: {e}")).into_response(),
    }
}

/// Gate for HTML pages
pub async fn password_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let identity = client_identity(&request, state.config.trust_proxy_headers);

    let authenticated = cookie_value(request.headers(), &state.config.auth_cookie_name)
        .is_some_and(|cookie| state.auth.is_cookie_valid(cookie, &identity));
    if authenticated {
        return next.run(request).await;
    }

    let action = request.uri().path().to_string();
    let submitted = if request.method() == Method::POST {
        match Form::<LoginForm>::from_request(request, &state).await {
            Ok(Form(form)) => Some(form.password),
            Err(rejection) => return rejection.into_response(),
        }
    } else {
        None
    };

    let decision = state
        .auth
        .evaluate(AuthRequest {
            identity: &identity,
            cookie: None,
            submitted_password: submitted.as_deref(),
        })
        .await;

    match decision {
        AuthDecision::LoggedIn { cookie, .. } => login_redirect(&state, &action, &cookie),
        AuthDecision::Rejected { attempts_remaining } => {
            let status = if attempts_remaining == 0 {
                StatusCode::TOO_MANY_REQUESTS
            } else {
                StatusCode::UNAUTHORIZED
            };
            login_page(
                &state,
                status,
                &action,
                Some("Incorrect password"),
                attempts_remaining,
            )
        }
        AuthDecision::ChallengeRequired | AuthDecision::Authenticated { .. } => {
            let remaining = state.auth.attempts_remaining(&identity).await;
            login_page(&state, StatusCode::OK, &action, None, remaining)
        }
    }
}

/// Gate for API endpoints
pub async fn require_cookie(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = client_identity(&request, state.config.trust_proxy_headers);
    let valid = cookie_value(request.headers(), &state.config.auth_cookie_name)
        .is_some_and(|cookie| state.auth.is_cookie_valid(cookie, &identity));

    if !valid {
        tracing::debug!(identity = %identity, path = %request.uri().path(), "API request without valid auth cookie");
        return Err(AppError::unauthorized());
    }

    Ok(next.run(request).await)
}
