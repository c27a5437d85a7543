/// Email delivery for verification and password reset codes
use crate::config::EmailSettings;
use crate::error::{Result, ServiceError};
use crate::validators::mask_email;
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Async email transport wrapper (SMTP or no-op)
#[derive(Clone)]
pub struct EmailService {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl EmailService {
    /// Build email service from configuration
    ///
    /// If SMTP host is empty, operates in no-op mode (logs only).
    pub fn new(config: &EmailSettings) -> Result<Self> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| ServiceError::Internal(format!("Invalid SMTP_FROM address: {}", e)))?;

        let transport = if config.smtp_host.trim().is_empty() {
            warn!("SMTP host not configured; email service will operate in no-op mode");
            None
        } else {
            let builder = if config.use_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            }?
            .port(config.smtp_port);

            let builder = if let (Some(username), Some(password)) =
                (&config.smtp_username, &config.smtp_password)
            {
                builder.credentials(Credentials::new(username.to_string(), password.to_string()))
            } else {
                builder
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }
}

#[async_trait]
impl NotificationSender for EmailService {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let Some(transport) = &self.transport else {
            info!(
                subject,
                recipient = %mask_email(to),
                "Email service running in no-op mode; skipping actual send"
            );
            return Ok(());
        };

        let recipient = to
            .parse::<Mailbox>()
            .map_err(|e| ServiceError::Validation(format!("Invalid recipient address: {}", e)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        transport.send(email).await?;
        info!(subject, recipient = %mask_email(to), "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(host: &str) -> EmailSettings {
        EmailSettings {
            smtp_host: host.to_string(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "Auth <no-reply@example.com>".to_string(),
            use_starttls: true,
        }
    }

    #[tokio::test]
    async fn test_noop_mode_when_host_empty() {
        let service = EmailService::new(&settings("")).unwrap();
        assert!(!service.is_enabled());
        assert!(service
            .send_email("a@b.com", "Please confirm your email", "Your confirmation code is: 123456")
            .await
            .is_ok());
    }

    #[test]
    fn test_smtp_mode_when_host_set() {
        let service = EmailService::new(&settings("smtp.example.com")).unwrap();
        assert!(service.is_enabled());
    }

    #[test]
    fn test_invalid_from_rejected() {
        let mut config = settings("");
        config.smtp_from = "not an address".to_string();
        assert!(EmailService::new(&config).is_err());
    }
}
