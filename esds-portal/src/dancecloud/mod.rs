//! DanceCloud membership card registry client
//!
//! DanceCloud speaks JSON:API. Cards come back in `data`, their members in
//! `included`; the two are joined on the card's `member` relationship.
//! Door checks include both their card and the card's member.

mod team;

pub use team::{DoorVolunteerTeam, PosTeam};

use async_trait::async_trait;
use card_printer::{BoxError, CardSource};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use shared::models::{MAX_CARD_NUMBER, MembershipCardCheck};
use shared::{CardFilter, CardStatus, MembershipCard};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

const JSON_API: &str = "application/vnd.api+json";

#[derive(Debug, Error)]
pub enum DanceCloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("DanceCloud returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("A card may only be reissued when damaged, lost or stolen (got {0})")]
    InvalidReissueReason(CardStatus),
}

pub type DanceCloudResult<T> = Result<T, DanceCloudError>;

/// Card registry operations beyond listing
#[async_trait]
pub trait CardRegistry: CardSource {
    async fn set_card_status(&self, card_id: &str, status: CardStatus) -> DanceCloudResult<()>;

    /// Ask the registry to replace a card; `reason` must be damaged, lost or stolen
    async fn reissue_card(&self, card_id: &str, reason: CardStatus) -> DanceCloudResult<()>;

    /// Door scans of membership cards, newest first
    async fn list_card_checks(&self) -> DanceCloudResult<Vec<MembershipCardCheck>>;
}

// ========== JSON:API payloads ==========

#[derive(Debug, Deserialize)]
struct CardDocument {
    data: Vec<CardResource>,
    #[serde(default)]
    included: Vec<IncludedResource>,
}

#[derive(Debug, Deserialize)]
struct CardResource {
    id: String,
    attributes: CardAttributes,
    relationships: CardRelationships,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardAttributes {
    number: NumberOrString,
    expires_at: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct CardRelationships {
    member: Relationship,
}

#[derive(Debug, Deserialize)]
struct Relationship {
    data: ResourceId,
}

#[derive(Debug, Deserialize)]
struct ResourceId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct IncludedResource {
    #[serde(rename = "type")]
    kind: String,
    id: String,
    #[serde(default)]
    attributes: serde_json::Value,
    #[serde(default)]
    relationships: serde_json::Value,
}

impl IncludedResource {
    fn index<'a>(included: &'a [IncludedResource], kind: &str) -> HashMap<&'a str, &'a Self> {
        included
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| (r.id.as_str(), r))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct CheckDocument {
    data: Vec<CheckResource>,
    #[serde(default)]
    included: Vec<IncludedResource>,
}

#[derive(Debug, Deserialize)]
struct CheckResource {
    id: String,
    attributes: CheckAttributes,
    relationships: CheckRelationships,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckAttributes {
    checked_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckRelationships {
    card: Relationship,
    #[serde(default)]
    checked_by: Option<OptionalRelationship>,
}

/// To-one relationship that may be `{"data": null}`
#[derive(Debug, Deserialize)]
struct OptionalRelationship {
    data: Option<ResourceId>,
}

/// Attributes of a card included alongside a check
#[derive(Debug, Deserialize)]
struct CheckedCardAttributes {
    number: NumberOrString,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberAttributes {
    first_name: String,
    last_name: String,
    #[serde(default)]
    email: String,
}

/// Card numbers arrive as either JSON numbers or strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u32),
    String(String),
}

impl NumberOrString {
    fn to_u32(&self) -> Option<u32> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.trim().parse().ok(),
        }
    }
}

/// Parse an ISO-8601 timestamp; one without an offset is taken as UTC
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

/// Card number, if it is numeric and fits the printed digits
fn card_number(card_id: &str, number: &NumberOrString) -> Option<u32> {
    let Some(n) = number.to_u32() else {
        warn!(card_id = %card_id, "card number is not numeric, skipped");
        return None;
    };
    if n > MAX_CARD_NUMBER {
        warn!(card_id = %card_id, card_number = n, "card number has more than six digits, skipped");
        return None;
    }
    Some(n)
}

/// Parse an ISO-8601 timestamp or date into the calendar date it names
fn parse_expiry(value: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn parse_cards(document: CardDocument) -> Vec<MembershipCard> {
    let members = IncludedResource::index(&document.included, "members");

    let mut cards = Vec::with_capacity(document.data.len());
    for resource in &document.data {
        let member_id = &resource.relationships.member.data.id;
        let Some(member) = members
            .get(member_id.as_str())
            .and_then(|m| MemberAttributes::deserialize(&m.attributes).ok())
        else {
            warn!(card_id = %resource.id, member_id = %member_id, "card member missing from response, skipped");
            continue;
        };
        let Some(card_number) = card_number(&resource.id, &resource.attributes.number) else {
            continue;
        };
        let Some(expires_at) = parse_expiry(&resource.attributes.expires_at) else {
            warn!(card_id = %resource.id, value = %resource.attributes.expires_at, "unparseable expiry, skipped");
            continue;
        };
        let Ok(status) = resource.attributes.status.parse::<CardStatus>() else {
            warn!(card_id = %resource.id, status = %resource.attributes.status, "unknown card status, skipped");
            continue;
        };

        cards.push(MembershipCard {
            card_id: resource.id.clone(),
            member_id: member_id.clone(),
            card_number,
            expires_at,
            first_name: member.first_name,
            last_name: member.last_name,
            email: member.email,
            status,
        });
    }
    cards
}

/// Join checks to their cards and members; newest first
fn parse_card_checks(document: CheckDocument) -> Vec<MembershipCardCheck> {
    let cards = IncludedResource::index(&document.included, "membership-cards");
    let members = IncludedResource::index(&document.included, "members");

    let mut checks = Vec::with_capacity(document.data.len());
    for resource in &document.data {
        let card_id = &resource.relationships.card.data.id;
        let Some(card) = cards.get(card_id.as_str()) else {
            warn!(check_id = %resource.id, card_id = %card_id, "checked card missing from response, skipped");
            continue;
        };
        let (Ok(card_attributes), Ok(card_relationships)) = (
            CheckedCardAttributes::deserialize(&card.attributes),
            CardRelationships::deserialize(&card.relationships),
        ) else {
            warn!(check_id = %resource.id, card_id = %card_id, "checked card is malformed, skipped");
            continue;
        };
        let member_id = card_relationships.member.data.id;
        let Some(member) = members
            .get(member_id.as_str())
            .and_then(|m| MemberAttributes::deserialize(&m.attributes).ok())
        else {
            warn!(check_id = %resource.id, member_id = %member_id, "card member missing from response, skipped");
            continue;
        };
        let Some(card_number) = card_number(card_id, &card_attributes.number) else {
            continue;
        };
        let Some(checked_at) = parse_timestamp(&resource.attributes.checked_at) else {
            warn!(check_id = %resource.id, value = %resource.attributes.checked_at, "unparseable check time, skipped");
            continue;
        };

        checks.push(MembershipCardCheck {
            check_id: resource.id.clone(),
            card_id: card_id.clone(),
            member_id,
            card_number,
            first_name: member.first_name,
            last_name: member.last_name,
            checked_at,
            checked_by: resource
                .relationships
                .checked_by
                .as_ref()
                .and_then(|r| r.data.as_ref())
                .map(|r| r.id.clone()),
        });
    }
    checks.sort_by(|a, b| b.checked_at.cmp(&a.checked_at));
    checks
}

/// DanceCloud API client
#[derive(Debug, Clone)]
pub struct DanceCloudClient {
    client: Client,
    /// e.g. `https://esds.dancecloud.xyz/api/v1`
    api_base: String,
    token: String,
}

impl DanceCloudClient {
    pub fn new(api_base: &str, token: impl Into<String>) -> DanceCloudResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    /// Authenticated JSON:API request
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(reqwest::header::ACCEPT, JSON_API)
    }

    /// Send a JSON:API document body
    async fn send_document(
        &self,
        method: Method,
        path: &str,
        body: serde_json::Value,
    ) -> DanceCloudResult<reqwest::Response> {
        let response = self
            .request(method, path)
            .header(reqwest::header::CONTENT_TYPE, JSON_API)
            .body(body.to_string())
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn get_document<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> DanceCloudResult<T> {
        let response = self.request(Method::GET, path).query(query).send().await?;
        let response = Self::check_status(response).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| DanceCloudError::InvalidResponse(e.to_string()))
    }

    async fn check_status(response: reqwest::Response) -> DanceCloudResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            warn!("DanceCloud rejected the API token");
        }
        Err(DanceCloudError::Status { status, body })
    }

    #[instrument(skip(self))]
    pub async fn fetch_cards(&self, filter: &CardFilter) -> DanceCloudResult<Vec<MembershipCard>> {
        let mut query: Vec<(&str, String)> = vec![
            ("page[size]", "9999".to_string()),
            ("include", "member".to_string()),
        ];
        if let Some(status) = filter.status {
            query.push(("filter[status]", status.to_string()));
        }
        if let Some(ids) = &filter.ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            query.push(("filter[id]", ids.join(",")));
        }

        let document: CardDocument = self.get_document("membership-cards", &query).await?;
        let cards = parse_cards(document);
        debug!(count = cards.len(), "membership cards fetched");
        Ok(cards)
    }

    #[instrument(skip(self))]
    pub async fn fetch_card_checks(&self) -> DanceCloudResult<Vec<MembershipCardCheck>> {
        let query = [
            ("page[size]", "9999".to_string()),
            ("include", "card.member,checkedBy".to_string()),
        ];
        let document: CheckDocument = self.get_document("membership-card-checks", &query).await?;
        let checks = parse_card_checks(document);
        debug!(count = checks.len(), "membership card checks fetched");
        Ok(checks)
    }
}

#[async_trait]
impl CardSource for DanceCloudClient {
    async fn list_cards(&self, filter: &CardFilter) -> Result<Vec<MembershipCard>, BoxError> {
        Ok(self.fetch_cards(filter).await?)
    }
}

#[async_trait]
impl CardRegistry for DanceCloudClient {
    #[instrument(skip(self))]
    async fn set_card_status(&self, card_id: &str, status: CardStatus) -> DanceCloudResult<()> {
        let body = serde_json::json!({
            "data": {
                "type": "membership-cards",
                "id": card_id,
                "attributes": { "status": status.as_str() },
            }
        });
        self.send_document(Method::PATCH, &format!("membership-cards/{card_id}"), body)
            .await?;

        info!(card_id = %card_id, status = %status, "card status updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn reissue_card(&self, card_id: &str, reason: CardStatus) -> DanceCloudResult<()> {
        if !reason.is_reissue_reason() {
            return Err(DanceCloudError::InvalidReissueReason(reason));
        }
        let body = serde_json::json!({ "action": { "status": reason.as_str() } });
        self.send_document(
            Method::POST,
            &format!("membership-cards/{card_id}/-actions/reissue"),
            body,
        )
        .await?;

        info!(card_id = %card_id, reason = %reason, "card reissue requested");
        Ok(())
    }

    async fn list_card_checks(&self) -> DanceCloudResult<Vec<MembershipCardCheck>> {
        self.fetch_card_checks().await
    }
}
