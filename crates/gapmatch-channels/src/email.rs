//! SMTP email sink (async lettre, STARTTLS relay).

use async_trait::async_trait;
use chrono::NaiveDate;
use gapmatch_core::config::EmailConfig;
use gapmatch_core::error::{GapMatchError, Result};
use gapmatch_core::traits::EmailSink;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

pub struct SmtpEmailSink {
    config: EmailConfig,
}

impl SmtpEmailSink {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, subject: &str, html: &str) -> Result<Message> {
        let from: Mailbox = self
            .config
            .sender()
            .ok_or_else(|| GapMatchError::sink("email", "No sender address configured"))?
            .parse()
            .map_err(|e| GapMatchError::sink("email", format!("Invalid from: {e}")))?;

        let mut builder = Message::builder().from(from).subject(subject);
        for to in &self.config.to {
            let mailbox: Mailbox = to
                .parse()
                .map_err(|e| GapMatchError::sink("email", format!("Invalid to '{to}': {e}")))?;
            builder = builder.to(mailbox);
        }

        builder
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|e| GapMatchError::sink("email", format!("Build email: {e}")))
    }
}

#[async_trait]
impl EmailSink for SmtpEmailSink {
    fn name(&self) -> &str {
        "email"
    }

    async fn send_html(&self, subject: &str, html: &str) -> Result<()> {
        let message = self.build_message(subject, html)?;
        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
            .map_err(|e| GapMatchError::sink("email", format!("SMTP relay: {e}")))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build();

        mailer
            .send(message)
            .await
            .map_err(|e| GapMatchError::sink("email", format!("SMTP send: {e}")))?;

        tracing::info!("📧 Digest sent to {}", self.config.to.join(", "));
        Ok(())
    }
}

/// Subject prefix followed by the long-form run date.
pub fn digest_subject(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix} \u{2014} {}", date.format("%B %d, %Y"))
}
