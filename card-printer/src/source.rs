//! Card data source collaborator

use crate::error::BoxError;
use async_trait::async_trait;
use shared::{CardFilter, MembershipCard};

/// Supplies membership card records (the upstream card registry)
///
/// Implementations apply their own timeout/retry policy; failures are
/// returned to the caller as-is.
#[async_trait]
pub trait CardSource: Send + Sync {
    async fn list_cards(&self, filter: &CardFilter) -> Result<Vec<MembershipCard>, BoxError>;
}

/// In-memory card source
#[async_trait]
impl CardSource for Vec<MembershipCard> {
    async fn list_cards(&self, filter: &CardFilter) -> Result<Vec<MembershipCard>, BoxError> {
        Ok(self.iter().filter(|c| filter.matches(c)).cloned().collect())
    }
}
