//! Membership Card Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Membership card lifecycle status
///
/// Owned by the upstream card registry; this side only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    New,
    Issued,
    Expired,
    Cancelled,
    Damaged,
    Lost,
    Stolen,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Issued => "issued",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Damaged => "damaged",
            Self::Lost => "lost",
            Self::Stolen => "stolen",
        }
    }

    /// Only damaged, lost or stolen cards may be reissued
    pub fn is_reissue_reason(&self) -> bool {
        matches!(self, Self::Damaged | Self::Lost | Self::Stolen)
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown card status
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown card status: {0}")]
pub struct UnknownCardStatus(pub String);

impl FromStr for CardStatus {
    type Err = UnknownCardStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "issued" => Ok(Self::Issued),
            "expired" => Ok(Self::Expired),
            "cancelled" => Ok(Self::Cancelled),
            "damaged" => Ok(Self::Damaged),
            "lost" => Ok(Self::Lost),
            "stolen" => Ok(Self::Stolen),
            other => Err(UnknownCardStatus(other.to_string())),
        }
    }
}

/// Largest card number that fits the six printed digits
pub const MAX_CARD_NUMBER: u32 = 999_999;

/// Membership card record as supplied by the card registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipCard {
    pub card_id: String,
    pub member_id: String,
    pub card_number: u32,
    pub expires_at: NaiveDate,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub status: CardStatus,
}

impl MembershipCard {
    /// URL encoded in the card's QR code
    pub fn check_url(&self, host: &str) -> String {
        format!(
            "{}/members/cards/{}/check",
            host.trim_end_matches('/'),
            self.card_id
        )
    }

    /// Card number as printed: six digits, zero-padded
    ///
    /// Exactly six only up to `MAX_CARD_NUMBER`; cards above it are
    /// dropped when the registry response is parsed.
    pub fn display_number(&self) -> String {
        format!("{:06}", self.card_number)
    }

    /// Expiry date as printed: DD/MM/YYYY
    pub fn display_expiry(&self) -> String {
        self.expires_at.format("%d/%m/%Y").to_string()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Query shape for listing cards from the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFilter {
    /// Restrict to these card ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    /// Restrict to this status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CardStatus>,
}

impl CardFilter {
    pub fn ids(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            ids: Some(ids.into_iter().map(Into::into).collect()),
            status: None,
        }
    }

    pub fn status(status: CardStatus) -> Self {
        Self {
            ids: None,
            status: Some(status),
        }
    }

    /// Check a card against this filter
    pub fn matches(&self, card: &MembershipCard) -> bool {
        let id_ok = self
            .ids
            .as_ref()
            .is_none_or(|ids| ids.iter().any(|id| id == &card.card_id));
        let status_ok = self.status.is_none_or(|s| s == card.status);
        id_ok && status_ok
    }
}
