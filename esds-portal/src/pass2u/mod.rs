//! Pass2U wallet pass client
//!
//! Creates Apple/Google wallet passes for membership cards and voids them
//! when a card is replaced. Pass ids are kept in the `wallet_passes` table,
//! keyed by card number.

use crate::config::Pass2uConfig;
use crate::db::repository::{RepoError, wallet_pass};
use chrono::{NaiveTime, TimeZone};
use chrono_tz::Europe::London;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use shared::MembershipCard;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, instrument};

const PASS_PAGE_BASE: &str = "https://www.pass2u.net/d";

#[derive(Debug, Error)]
pub enum Pass2uError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Pass2U returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Invalid expiry date for card {0}")]
    InvalidExpiry(u32),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub type Pass2uResult<T> = Result<T, Pass2uError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePassResponse {
    pass_id: String,
}

/// Page where a member collects their pass
pub fn pass_url(pass_id: &str) -> String {
    format!("{PASS_PAGE_BASE}/{pass_id}")
}

/// Pass2U API client
#[derive(Debug, Clone)]
pub struct Pass2uClient {
    client: Client,
    config: Pass2uConfig,
    check_url_host: String,
    pool: SqlitePool,
}

impl Pass2uClient {
    pub fn new(
        config: Pass2uConfig,
        check_url_host: impl Into<String>,
        pool: SqlitePool,
    ) -> Pass2uResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            config,
            check_url_host: check_url_host.into(),
            pool,
        })
    }

    fn passes_url(&self) -> String {
        format!(
            "{}/models/{}/passes",
            self.config.host.trim_end_matches('/'),
            self.config.model_id
        )
    }

    async fn check_status(response: reqwest::Response) -> Pass2uResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Pass2uError::Status { status, body })
    }

    /// Create a pass for `card` and remember its id; returns the pass id
    #[instrument(skip(self, card), fields(card_number = card.card_number))]
    pub async fn create_wallet_pass(&self, card: &MembershipCard) -> Pass2uResult<String> {
        // Expiry is a calendar date; the pass expires at the end of that day, UK time
        let end_of_day = card
            .expires_at
            .and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default());
        let expiration = London
            .from_local_datetime(&end_of_day)
            .earliest()
            .ok_or(Pass2uError::InvalidExpiry(card.card_number))?;

        let body = serde_json::json!({
            "expirationDate": expiration.to_rfc3339(),
            "barcode": {
                "message": card.check_url(&self.check_url_host),
                "altText": "QR code",
            },
            "fields": [
                { "key": "name", "value": card.full_name() },
                { "key": "expiryDateStr", "value": card.expires_at.format("%d %B %Y").to_string() },
                { "key": "cardNumber", "value": card.card_number.to_string() },
            ],
        });

        let response = self
            .client
            .post(self.passes_url())
            .header("x-api-key", &self.config.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;
        let created: CreatePassResponse = Self::check_status(response).await?.json().await?;
        debug!(pass_id = %created.pass_id, "wallet pass created");

        wallet_pass::upsert(&self.pool, card.card_number, &created.pass_id).await?;
        info!("wallet pass created");

        Ok(created.pass_id)
    }

    /// Void the card's pass if one was recorded
    ///
    /// Returns `false` when no pass is known for the card.
    #[instrument(skip(self, card), fields(card_number = card.card_number))]
    pub async fn void_wallet_pass_if_exists(&self, card: &MembershipCard) -> Pass2uResult<bool> {
        let Some(pass_id) = wallet_pass::find_pass_id(&self.pool, card.card_number).await? else {
            info!("no wallet pass recorded for card, nothing to void");
            return Ok(false);
        };

        let response = self
            .client
            .put(format!("{}/{}", self.passes_url(), pass_id))
            .header("x-api-key", &self.config.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&serde_json::json!({ "voided": true }))
            .send()
            .await?;
        Self::check_status(response).await?;

        wallet_pass::delete(&self.pool, card.card_number).await?;
        info!(pass_id = %pass_id, "wallet pass voided");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use chrono::NaiveDate;
    use shared::CardStatus;
    use wiremock::matchers::{body_json, body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn card(expires_at: NaiveDate) -> MembershipCard {
        MembershipCard {
            card_id: "card1".into(),
            member_id: "member1".into(),
            card_number: 1234,
            expires_at,
            first_name: "Alice".into(),
            last_name: "Smith".into(),
            email: "alice@example.com".into(),
            status: CardStatus::New,
        }
    }

    async fn client(server: &MockServer, pool: SqlitePool) -> Pass2uClient {
        Pass2uClient::new(
            Pass2uConfig {
                host: server.uri(),
                api_key: "p2u-key".into(),
                model_id: "777".into(),
            },
            "https://esds.dancecloud.xyz",
            pool,
        )
        .unwrap()
    }

    #[test]
    fn test_pass_url() {
        assert_eq!(pass_url("abc"), "https://www.pass2u.net/d/abc");
    }

    #[tokio::test]
    async fn test_create_wallet_pass() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/777/passes"))
            .and(header("x-api-key", "p2u-key"))
            .and(body_json(serde_json::json!({
                "expirationDate": "2025-12-31T23:59:59+00:00",
                "barcode": {
                    "message": "https://esds.dancecloud.xyz/members/cards/card1/check",
                    "altText": "QR code"
                },
                "fields": [
                    { "key": "name", "value": "Alice Smith" },
                    { "key": "expiryDateStr", "value": "31 December 2025" },
                    { "key": "cardNumber", "value": "1234" }
                ]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "passId": "pass-1" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let pool = memory_pool().await;
        let wallet = client(&server, pool.clone()).await;
        let pass_id = wallet
            .create_wallet_pass(&card(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()))
            .await
            .unwrap();

        assert_eq!(pass_id, "pass-1");
        assert_eq!(
            wallet_pass::find_pass_id(&pool, 1234).await.unwrap().as_deref(),
            Some("pass-1")
        );
    }

    #[tokio::test]
    async fn test_expiration_uses_summer_time() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "expirationDate": "2026-07-31T23:59:59+01:00"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "passId": "pass-2" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let wallet = client(&server, memory_pool().await).await;
        wallet
            .create_wallet_pass(&card(NaiveDate::from_ymd_opt(2026, 7, 31).unwrap()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_failure_records_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let pool = memory_pool().await;
        let wallet = client(&server, pool.clone()).await;
        let err = wallet
            .create_wallet_pass(&card(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()))
            .await
            .unwrap_err();

        assert!(matches!(err, Pass2uError::Status { status, .. } if status == StatusCode::FORBIDDEN));
        assert!(wallet_pass::find_pass_id(&pool, 1234).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_void_existing_pass() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/models/777/passes/pass-9"))
            .and(body_json(serde_json::json!({ "voided": true })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let pool = memory_pool().await;
        wallet_pass::upsert(&pool, 1234, "pass-9").await.unwrap();
        let wallet = client(&server, pool.clone()).await;

        let voided = wallet
            .void_wallet_pass_if_exists(&card(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()))
            .await
            .unwrap();
        assert!(voided);
        assert!(wallet_pass::find_pass_id(&pool, 1234).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_void_without_pass_is_noop() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let wallet = client(&server, memory_pool().await).await;
        let voided = wallet
            .void_wallet_pass_if_exists(&card(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()))
            .await
            .unwrap();
        assert!(!voided);
    }
}
