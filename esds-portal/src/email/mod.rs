//! Membership emails
//!
//! One message per card: plain-text fallback, HTML body with the card face
//! inline, and the same PNG as a regular attachment.

use crate::config::SmtpConfig;
use crate::templates::{self, Templates};
use async_trait::async_trait;
use card_printer::BoxError;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use shared::MembershipCard;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

pub const SUBJECT: &str = "Your ESDS Membership";

/// Content-ID of the inline card image
pub const CARD_CID: &str = "membership_card_cid";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("Invalid content type: {0}")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Delivers one composed message
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), BoxError>;
}

/// SMTP relay over implicit TLS
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    pub fn new(config: &SmtpConfig) -> Result<Self, EmailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self { transport })
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, message: Message) -> Result<(), BoxError> {
        self.transport.send(message).await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct EmailContext<'a> {
    first_name: &'a str,
    last_name: &'a str,
    card_cid: &'a str,
    wallet_pass_url: Option<&'a str>,
}

/// Composes and sends membership emails
#[derive(Clone)]
pub struct Mailer {
    transport: Arc<dyn MailTransport>,
    templates: Arc<Templates>,
    from: Mailbox,
    /// Delay between consecutive messages in a batch
    pace: Duration,
}

impl Mailer {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        templates: Arc<Templates>,
        from: &str,
    ) -> Result<Self, EmailError> {
        Ok(Self {
            transport,
            templates,
            from: from.parse()?,
            pace: Duration::from_secs(1),
        })
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    pub fn compose(
        &self,
        card: &MembershipCard,
        card_png: Vec<u8>,
        wallet_pass_url: Option<&str>,
    ) -> Result<Message, EmailError> {
        let context = EmailContext {
            first_name: &card.first_name,
            last_name: &card.last_name,
            card_cid: CARD_CID,
            wallet_pass_url,
        };
        let text = self
            .templates
            .render(templates::MEMBERSHIP_EMAIL_TEXT, &context)?;
        let html = self
            .templates
            .render(templates::MEMBERSHIP_EMAIL_HTML, &context)?;

        let to = Mailbox::new(Some(card.full_name()), card.email.parse()?);

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(SUBJECT)
            .multipart(
                MultiPart::mixed()
                    .multipart(
                        MultiPart::alternative()
                            .singlepart(SinglePart::plain(text))
                            .multipart(
                                MultiPart::related()
                                    .singlepart(SinglePart::html(html))
                                    .singlepart(
                                        Attachment::new_inline(CARD_CID.to_string())
                                            .body(card_png.clone(), ContentType::parse("image/png")?),
                                    ),
                            ),
                    )
                    .singlepart(
                        Attachment::new(format!("membership_card_{}.png", card.card_id))
                            .body(card_png, ContentType::parse("image/png")?),
                    ),
            )?;
        Ok(message)
    }

    pub async fn send(&self, message: Message) -> Result<(), BoxError> {
        self.transport.send(message).await
    }

    /// Send every message; a failure is logged and reported as `false`
    /// without stopping the batch
    pub async fn send_all(&self, messages: Vec<Message>) -> Vec<bool> {
        let total = messages.len();
        let mut delivered = Vec::with_capacity(total);
        for (i, message) in messages.into_iter().enumerate() {
            if i > 0 && !self.pace.is_zero() {
                tokio::time::sleep(self.pace).await;
            }
            let recipients: Vec<String> = message
                .envelope()
                .to()
                .iter()
                .map(|a| a.to_string())
                .collect();
            debug!(to = ?recipients, "sending membership email");
            match self.transport.send(message).await {
                Ok(()) => delivered.push(true),
                Err(e) => {
                    error!(to = ?recipients, error = %e, "email was not delivered");
                    delivered.push(false);
                }
            }
        }
        info!(
            sent = delivered.iter().filter(|d| **d).count(),
            total, "membership emails processed"
        );
        delivered
    }
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("from", &self.from)
            .field("pace", &self.pace)
            .finish_non_exhaustive()
    }
}

/// Test transport that records messages and fails for chosen recipients
#[cfg(test)]
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: std::sync::Mutex<Vec<String>>,
    pub fail_for: Vec<String>,
}

#[cfg(test)]
#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: Message) -> Result<(), BoxError> {
        let to: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(|a| a.to_string())
            .collect();
        if to.iter().any(|t| self.fail_for.contains(t)) {
            return Err("550 mailbox unavailable".into());
        }
        self.sent
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(&message.formatted()).into_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::CardStatus;

    fn card(id: &str, email: &str) -> MembershipCard {
        MembershipCard {
            card_id: id.into(),
            member_id: "member1".into(),
            card_number: 1234,
            expires_at: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            first_name: "Alice".into(),
            last_name: "Smith".into(),
            email: email.into(),
            status: CardStatus::New,
        }
    }

    fn mailer(transport: Arc<RecordingTransport>) -> Mailer {
        Mailer::new(
            transport,
            Arc::new(Templates::new().unwrap()),
            "ESDS <info@esds.org.uk>",
        )
        .unwrap()
        .with_pace(Duration::ZERO)
    }

    #[test]
    fn test_compose_structure() {
        let mailer = mailer(Arc::new(RecordingTransport::default()));
        let message = mailer
            .compose(
                &card("card1", "alice@example.com"),
                vec![0x89, b'P', b'N', b'G'],
                Some("https://www.pass2u.net/d/pass-1"),
            )
            .unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();

        assert!(raw.contains("Subject: Your ESDS Membership"));
        assert!(raw.contains("multipart/related"));
        assert!(raw.contains("Content-ID: <membership_card_cid>"));
        assert!(raw.contains("membership_card_card1.png"));
        assert!(raw.contains("text/plain"));
        assert!(raw.contains("text/html"));
    }

    #[test]
    fn test_compose_rejects_bad_address() {
        let mailer = mailer(Arc::new(RecordingTransport::default()));
        let err = mailer
            .compose(&card("card1", "not-an-address"), Vec::new(), None)
            .unwrap_err();
        assert!(matches!(err, EmailError::Address(_)));
    }

    #[tokio::test]
    async fn test_send_all_continues_past_failures() {
        let transport = Arc::new(RecordingTransport {
            fail_for: vec!["bob@example.com".to_string()],
            ..Default::default()
        });
        let mailer = mailer(transport.clone());

        let messages = ["alice@example.com", "bob@example.com", "carol@example.com"]
            .iter()
            .enumerate()
            .map(|(i, email)| {
                mailer
                    .compose(&card(&format!("card{i}"), email), vec![1, 2, 3], None)
                    .unwrap()
            })
            .collect();

        let delivered = mailer.send_all(messages).await;
        assert_eq!(delivered, vec![true, false, true]);
        assert_eq!(transport.sent.lock().unwrap().len(), 2);
    }
}
