use std::sync::Arc;

use tracing::{error, info};

use crate::email_service::EmailService;
use crate::executor::{NotificationError, NotificationService};

/// Emails every non-empty report to a single recipient
pub struct NotificationServiceImpl {
    recipient: String,
    email_service: Arc<dyn EmailService>,
}

impl NotificationServiceImpl {
    pub fn new(recipient: &str, email_service: Arc<dyn EmailService>) -> Self {
        Self {
            recipient: recipient.to_string(),
            email_service,
        }
    }

    fn subject(sessions: usize) -> String {
        match sessions {
            1 => "Vaccination slots available (1 session)".to_string(),
            n => format!("Vaccination slots available ({} sessions)", n),
        }
    }
}

#[async_trait::async_trait]
impl NotificationService for NotificationServiceImpl {
    async fn send_availability_notification(
        &self,
        report: &str,
        sessions: usize,
    ) -> Result<(), NotificationError> {
        let subject = Self::subject(sessions);

        match self
            .email_service
            .send_email(&self.recipient, &subject, report)
            .await
        {
            Ok(external_id) => {
                info!(
                    "Email sent successfully to {} ({})",
                    self.recipient, external_id
                );
                Ok(())
            }
            Err(e) => {
                error!("Failed to send email to {}: {}", self.recipient, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingEmailService {
        sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait::async_trait]
    impl EmailService for CapturingEmailService {
        async fn send_email(
            &self,
            to: &str,
            subject: &str,
            body: &str,
        ) -> Result<String, NotificationError> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string(), body.to_string()));
            Ok("mock-email-id".to_string())
        }
    }

    struct BrokenEmailService;

    #[async_trait::async_trait]
    impl EmailService for BrokenEmailService {
        async fn send_email(
            &self,
            _to: &str,
            _subject: &str,
            _body: &str,
        ) -> Result<String, NotificationError> {
            Err(NotificationError::Email("535 authentication failed".to_string()))
        }
    }

    #[tokio::test]
    async fn test_report_is_emailed_to_recipient() {
        let email = Arc::new(CapturingEmailService::default());
        let service = NotificationServiceImpl::new("me@example.com", email.clone());

        service
            .send_availability_notification("Center  Lok Nayak\n", 3)
            .await
            .unwrap();

        let sent = email.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "me@example.com");
        assert_eq!(sent[0].1, "Vaccination slots available (3 sessions)");
        assert_eq!(sent[0].2, "Center  Lok Nayak\n");
    }

    #[tokio::test]
    async fn test_delivery_failure_is_returned() {
        let service = NotificationServiceImpl::new("me@example.com", Arc::new(BrokenEmailService));
        let result = service.send_availability_notification("report", 1).await;
        assert!(matches!(result, Err(NotificationError::Email(_))));
    }
}
