use std::time::Duration;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::executor::NotificationError;

/// Default relay, matches the usual Gmail app-password setup
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for email service implementations
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Send a plain text email and return an identifier for the delivery
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, NotificationError>;
}

/// SMTP email service authenticating as the sender mailbox
pub struct SmtpEmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailService {
    /// Create a TLS relay to `host`; `username` is also used as the From address
    pub fn new(host: &str, username: &str, password: &str) -> Result<Self, NotificationError> {
        let from = parse_mailbox(username)?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| NotificationError::Email(format!("Invalid SMTP relay {}: {}", host, e)))?
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self { mailer, from })
    }
}

#[async_trait]
impl EmailService for SmtpEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, NotificationError> {
        info!("Sending email to {} with subject: {}", to, subject);

        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(to)?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotificationError::Email(format!("Failed to build email: {}", e)))?;

        let response = self
            .mailer
            .send(message)
            .await
            .map_err(|e| NotificationError::Email(format!("SMTP delivery failed: {}", e)))?;

        Ok(response.message().collect::<Vec<&str>>().join(" "))
    }
}

/// Email service that only logs, used for dry runs
pub struct MockEmailService;

#[async_trait]
impl EmailService for MockEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<String, NotificationError> {
        info!("📧 [MOCK EMAIL] To: {}", to);
        info!("📧 [MOCK EMAIL] Subject: {}", subject);
        info!("📧 [MOCK EMAIL] Body:\n{}", body);

        let mock_id = format!("mock-email-{}", uuid::Uuid::new_v4());
        Ok(mock_id)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotificationError> {
    address
        .parse::<Mailbox>()
        .map_err(|_| NotificationError::InvalidAddress(address.to_string()))
}
