//! Card auto-issuer
//!
//! Periodically picks up cards in status `new`, emails each member their
//! card (with a wallet pass link when Pass2U is configured) and marks the
//! card `issued` once the email has gone out.

use crate::dancecloud::CardRegistry;
use crate::email::{EmailError, Mailer};
use crate::pass2u::{Pass2uClient, pass_url};
use crate::state::AppState;
use card_printer::{BoxError, CardRenderer, PrintError, PrintResult};
use lettre::Message;
use shared::{CardFilter, CardStatus, MembershipCard};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("Card source failed: {0}")]
    Source(BoxError),

    #[error(transparent)]
    Render(#[from] PrintError),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error("Email was not delivered: {0}")]
    Delivery(BoxError),
}

/// Outcome of one issuing pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueReport {
    pub found: usize,
    pub issued: usize,
    pub failed: usize,
}

/// Render a card front on the blocking pool
pub async fn render_front_png(
    renderer: Arc<CardRenderer>,
    card: MembershipCard,
) -> PrintResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || renderer.render_front(&card))
        .await
        .map_err(|e| PrintError::Task(e.to_string()))?
}

#[derive(Clone)]
pub struct CardIssuer {
    registry: Arc<dyn CardRegistry>,
    renderer: Arc<CardRenderer>,
    wallet: Option<Pass2uClient>,
    mailer: Mailer,
}

impl CardIssuer {
    /// `None` when email is not configured
    pub fn from_state(state: &AppState) -> Option<Self> {
        Some(Self {
            registry: state.registry.clone(),
            renderer: state.renderer.clone(),
            wallet: state.wallet.clone(),
            mailer: state.mailer.clone()?,
        })
    }

    /// Render the card and compose its email
    ///
    /// A wallet pass failure only drops the wallet link.
    pub async fn prepare_email(&self, card: &MembershipCard) -> Result<Message, IssueError> {
        let png = render_front_png(self.renderer.clone(), card.clone()).await?;

        let wallet_url = match &self.wallet {
            Some(wallet) => match wallet.create_wallet_pass(card).await {
                Ok(pass_id) => Some(pass_url(&pass_id)),
                Err(e) => {
                    warn!(card_id = %card.card_id, error = %e, "wallet pass not created");
                    None
                }
            },
            None => None,
        };

        Ok(self.mailer.compose(card, png, wallet_url.as_deref())?)
    }

    /// Email one card to its member
    pub async fn send_card(&self, card: &MembershipCard) -> Result<(), IssueError> {
        let message = self.prepare_email(card).await?;
        self.mailer
            .send(message)
            .await
            .map_err(IssueError::Delivery)?;
        info!(card_id = %card.card_id, "membership email sent");
        Ok(())
    }

    /// One pass over all cards in status `new`
    pub async fn issue_new_cards(&self) -> Result<IssueReport, IssueError> {
        let cards = self
            .registry
            .list_cards(&CardFilter::status(CardStatus::New))
            .await
            .map_err(IssueError::Source)?;

        let mut report = IssueReport {
            found: cards.len(),
            ..Default::default()
        };
        if cards.is_empty() {
            return Ok(report);
        }

        let mut ready = Vec::with_capacity(cards.len());
        let mut messages = Vec::with_capacity(cards.len());
        for card in cards {
            match self.prepare_email(&card).await {
                Ok(message) => {
                    ready.push(card);
                    messages.push(message);
                }
                Err(e) => {
                    error!(card_id = %card.card_id, error = %e, "could not prepare membership email");
                    report.failed += 1;
                }
            }
        }

        let delivered = self.mailer.send_all(messages).await;
        for (card, sent) in ready.iter().zip(delivered) {
            if !sent {
                report.failed += 1;
                continue;
            }
            match self
                .registry
                .set_card_status(&card.card_id, CardStatus::Issued)
                .await
            {
                Ok(()) => report.issued += 1,
                Err(e) => {
                    error!(card_id = %card.card_id, error = %e, "emailed card not marked issued");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Run `issue_new_cards` every `interval`, starting one interval from now
    pub fn spawn(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            info!(interval_secs = interval.as_secs(), "card issuer started");

            loop {
                ticker.tick().await;
                match self.issue_new_cards().await {
                    Ok(report) => info!(
                        found = report.found,
                        issued = report.issued,
                        failed = report.failed,
                        "card issuing pass complete"
                    ),
                    Err(e) => error!(error = %e, "card issuing pass failed"),
                }
            }
        })
    }
}

impl std::fmt::Debug for CardIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardIssuer")
            .field("wallet", &self.wallet.is_some())
            .field("mailer", &self.mailer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::RecordingTransport;
    use crate::test_support::{FakeRegistry, card, test_state};

    async fn issuer(registry: Arc<FakeRegistry>, transport: Arc<RecordingTransport>) -> CardIssuer {
        let mut state = test_state(registry).await;
        state.mailer = Some(
            Mailer::new(transport, state.templates.clone(), "info@esds.org.uk")
                .unwrap()
                .with_pace(Duration::ZERO),
        );
        CardIssuer::from_state(&state).unwrap()
    }

    #[tokio::test]
    async fn test_without_mailer_there_is_no_issuer() {
        let state = test_state(Arc::new(FakeRegistry::default())).await;
        assert!(CardIssuer::from_state(&state).is_none());
    }

    #[tokio::test]
    async fn test_only_delivered_cards_are_marked_issued() {
        let registry = Arc::new(FakeRegistry::with_cards(vec![
            card("c1", 1, CardStatus::New),
            card("c2", 2, CardStatus::New),
            card("c3", 3, CardStatus::Issued),
            card("c4", 4, CardStatus::New),
        ]));
        let transport = Arc::new(RecordingTransport {
            fail_for: vec!["c2@example.com".to_string()],
            ..Default::default()
        });

        let report = issuer(registry.clone(), transport.clone())
            .await
            .issue_new_cards()
            .await
            .unwrap();

        assert_eq!(
            report,
            IssueReport {
                found: 3,
                issued: 2,
                failed: 1
            }
        );
        let updates = registry.status_updates.lock().unwrap().clone();
        assert_eq!(
            updates,
            vec![
                ("c1".to_string(), CardStatus::Issued),
                ("c4".to_string(), CardStatus::Issued),
            ]
        );
        assert_eq!(transport.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_registry_failure_is_reported() {
        let registry = Arc::new(FakeRegistry {
            fail: true,
            ..Default::default()
        });
        let err = issuer(registry, Arc::new(RecordingTransport::default()))
            .await
            .issue_new_cards()
            .await
            .unwrap_err();
        assert!(matches!(err, IssueError::Source(_)));
    }

    #[tokio::test]
    async fn test_send_card() {
        let registry = Arc::new(FakeRegistry::default());
        let transport = Arc::new(RecordingTransport::default());
        let issuer = issuer(registry.clone(), transport.clone()).await;

        issuer
            .send_card(&card("c9", 9, CardStatus::Issued))
            .await
            .unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("membership_card_c9.png"));
        // Resending does not touch the registry
        assert!(registry.status_updates.lock().unwrap().is_empty());
    }
}
