//! Membership Card Check Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scan of a membership card at the door
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipCardCheck {
    pub check_id: String,
    pub card_id: String,
    pub member_id: String,
    pub card_number: u32,
    pub first_name: String,
    pub last_name: String,
    pub checked_at: DateTime<Utc>,
    /// DanceCloud user who scanned the card, when recorded
    pub checked_by: Option<String>,
}

impl MembershipCardCheck {
    pub fn display_number(&self) -> String {
        format!("{:06}", self.card_number)
    }
}
