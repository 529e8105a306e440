//! Fixtures shared by the router and middleware tests

use crate::auth::CookieSigner;
use crate::config::Config;
use crate::dancecloud::{CardRegistry, DanceCloudError, DanceCloudResult, PosTeam};
use crate::db::memory_pool;
use crate::state::AppState;
use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use card_printer::{BoxError, CardSource};
use axum::http::StatusCode;
use chrono::NaiveDate;
use shared::models::{DoorVolunteer, MembershipCardCheck};
use shared::{CardFilter, CardStatus, MembershipCard};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub const PASSWORD: &str = "swing";

pub fn test_config() -> Config {
    Config::from_lookup(|name| {
        let value = match name {
            "UI_PASSWORD" => PASSWORD,
            "COOKIE_SECRET" => "cookie-key",
            "DC_API_TOKEN" => "dc-token",
            "CARD_DPI" => "100",
            _ => return None,
        };
        Some(value.to_string())
    })
    .unwrap()
}

pub fn card(id: &str, number: u32, status: CardStatus) -> MembershipCard {
    MembershipCard {
        card_id: id.to_string(),
        member_id: format!("member-{id}"),
        card_number: number,
        expires_at: NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
        first_name: "Alice".to_string(),
        last_name: "Smith".to_string(),
        email: format!("{id}@example.com"),
        status,
    }
}

/// In-memory card registry that records writes
#[derive(Default)]
pub struct FakeRegistry {
    pub cards: Vec<MembershipCard>,
    pub checks: Vec<MembershipCardCheck>,
    pub fail: bool,
    pub status_updates: Mutex<Vec<(String, CardStatus)>>,
    pub reissues: Mutex<Vec<(String, CardStatus)>>,
}

impl FakeRegistry {
    pub fn with_cards(cards: Vec<MembershipCard>) -> Self {
        Self {
            cards,
            ..Default::default()
        }
    }
}

#[async_trait]
impl CardSource for FakeRegistry {
    async fn list_cards(&self, filter: &CardFilter) -> Result<Vec<MembershipCard>, BoxError> {
        if self.fail {
            return Err("registry unavailable".into());
        }
        self.cards.list_cards(filter).await
    }
}

#[async_trait]
impl CardRegistry for FakeRegistry {
    async fn set_card_status(&self, card_id: &str, status: CardStatus) -> DanceCloudResult<()> {
        self.status_updates
            .lock()
            .unwrap()
            .push((card_id.to_string(), status));
        Ok(())
    }

    async fn reissue_card(&self, card_id: &str, reason: CardStatus) -> DanceCloudResult<()> {
        if !reason.is_reissue_reason() {
            return Err(DanceCloudError::InvalidReissueReason(reason));
        }
        self.reissues
            .lock()
            .unwrap()
            .push((card_id.to_string(), reason));
        Ok(())
    }

    async fn list_card_checks(&self) -> DanceCloudResult<Vec<MembershipCardCheck>> {
        if self.fail {
            return Err(DanceCloudError::InvalidResponse("registry unavailable".into()));
        }
        Ok(self.checks.clone())
    }
}

/// In-memory door volunteers team; rejects an email already on it
#[derive(Default)]
pub struct FakeTeam {
    pub volunteers: Mutex<Vec<DoorVolunteer>>,
}

fn status_error(status: StatusCode) -> DanceCloudError {
    DanceCloudError::Status {
        status,
        body: String::new(),
    }
}

#[async_trait]
impl PosTeam for FakeTeam {
    async fn list_volunteers(&self) -> DanceCloudResult<Vec<DoorVolunteer>> {
        Ok(self.volunteers.lock().unwrap().clone())
    }

    async fn add_volunteer(&self, email: &str) -> DanceCloudResult<()> {
        let mut volunteers = self.volunteers.lock().unwrap();
        if volunteers.iter().any(|v| v.email == email) {
            return Err(status_error(StatusCode::UNPROCESSABLE_ENTITY));
        }
        let volunteer_id = format!("tm-{}", volunteers.len() + 1);
        volunteers.push(DoorVolunteer {
            volunteer_id,
            first_name: "Door".to_string(),
            last_name: "Volunteer".to_string(),
            email: email.to_string(),
        });
        Ok(())
    }

    async fn remove_volunteer(&self, volunteer_id: &str) -> DanceCloudResult<()> {
        let mut volunteers = self.volunteers.lock().unwrap();
        let Some(index) = volunteers.iter().position(|v| v.volunteer_id == volunteer_id) else {
            return Err(status_error(StatusCode::NOT_FOUND));
        };
        volunteers.remove(index);
        Ok(())
    }
}

pub async fn test_state(registry: Arc<FakeRegistry>) -> AppState {
    AppState::from_parts(test_config(), memory_pool().await, registry).unwrap()
}

/// `Cookie` header value carrying a valid auth cookie for `ip`
pub fn auth_cookie(state: &AppState, ip: &str) -> String {
    let token = CookieSigner::new(&state.config.cookie_secret)
        .sign_at(ip, shared::util::now_secs())
        .unwrap();
    format!("{}={}", state.config.auth_cookie_name, token)
}

/// Attach a peer address the way `into_make_service_with_connect_info` does
pub fn from_peer(mut request: Request<Body>, ip: &str) -> Request<Body> {
    let addr: SocketAddr = format!("{ip}:50000").parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
