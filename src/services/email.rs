//! Email service for lifecycle notices

use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Send a notice to a member. The SMTP exchange runs on the blocking pool.
    pub async fn send_notice(&self, to: &str, recipient_name: &str, subject: &str, message: &str) -> AppResult<()> {
        if !self.config.enabled {
            tracing::debug!("Email disabled, not sending '{}' to {}", subject, to);
            return Ok(());
        }

        let library = self.config.smtp_from_name.as_deref().unwrap_or("LibHub");
        let body = format!(
            r#"
Hello {name},

{message}

Thank you,
{library}
"#,
            name = recipient_name,
            message = message,
            library = library
        );

        let service = self.clone();
        let to = to.to_string();
        let subject = subject.to_string();
        tokio::task::spawn_blocking(move || service.send_email(&to, &subject, &body))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
    }

    /// Blocking SMTP send
    fn send_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("LibHub");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><p>{}</p></body></html>"#,
                                body.trim().replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = match (&self.config.smtp_username, &self.config.smtp_password) {
            (Some(username), Some(password)) => {
                mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => mailer_builder,
        };

        mailer_builder
            .build()
            .send(&email)
            .map_err(|e| AppError::Internal(format!("Failed to send email to {}: {}", to, e)))?;

        tracing::debug!("Sent '{}' to {}", subject, to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_email_is_a_no_op() {
        let service = EmailService::new(EmailConfig::default());
        assert!(!service.is_enabled());
        assert!(service
            .send_notice("not an address", "Ada", "Subject", "Body")
            .await
            .is_ok());
    }
}
