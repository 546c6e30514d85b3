//! Outgoing mail transport.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use service_core::error::AppError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email not enabled: {0}")]
    NotEnabled(String),

    #[error("Email configuration error: {0}")]
    Configuration(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Failed to send email: {0}")]
    SendFailed(String),
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::InvalidRecipient(_) => AppError::BadRequest(anyhow::anyhow!(err)),
            other => AppError::EmailError(other.to_string()),
        }
    }
}

/// File attached to a message.
#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl EmailAttachment {
    pub fn pdf(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: "application/pdf".to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: String,
    pub attachment: Option<EmailAttachment>,
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, email: &EmailMessage) -> Result<(), EmailError>;
    fn is_enabled(&self) -> bool;
}

pub struct SmtpEmailProvider {
    config: SmtpConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpEmailProvider {
    pub fn new(config: SmtpConfig) -> Result<Self, EmailError> {
        if !config.enabled {
            return Ok(Self {
                config,
                transport: None,
            });
        }

        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| EmailError::Configuration(format!("Failed to create SMTP relay: {}", e)))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            config,
            transport: Some(transport),
        })
    }

    fn build_message(&self, email: &EmailMessage) -> Result<Message, EmailError> {
        let from_mailbox: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| EmailError::Configuration(format!("Invalid from address: {}", e)))?;

        let to_mailbox: Mailbox = email
            .to
            .parse()
            .map_err(|e| EmailError::InvalidRecipient(format!("{}: {}", email.to, e)))?;

        let body = MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(email.body_text.clone()),
            )
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(email.body_html.clone()),
            );

        let builder = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(&email.subject);

        let message = match &email.attachment {
            Some(file) => {
                let content_type = ContentType::parse(&file.content_type).map_err(|e| {
                    EmailError::Configuration(format!("Invalid attachment type: {}", e))
                })?;
                builder.multipart(
                    MultiPart::mixed()
                        .multipart(body)
                        .singlepart(
                            Attachment::new(file.filename.clone())
                                .body(file.data.clone(), content_type),
                        ),
                )
            }
            None => builder.multipart(body),
        };

        message.map_err(|e| EmailError::SendFailed(format!("Failed to build message: {}", e)))
    }
}

#[async_trait]
impl EmailProvider for SmtpEmailProvider {
    async fn send(&self, email: &EmailMessage) -> Result<(), EmailError> {
        if !self.config.enabled {
            return Err(EmailError::NotEnabled(
                "SMTP email provider is not enabled".to_string(),
            ));
        }

        let transport = self.transport.as_ref().ok_or_else(|| {
            EmailError::Configuration("SMTP transport not initialized".to_string())
        })?;

        let message = self.build_message(email)?;

        transport
            .send(message)
            .await
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            attachment = email.attachment.is_some(),
            "Email sent successfully"
        );

        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

/// Mock email provider for testing. Keeps every accepted message.
pub struct MockEmailProvider {
    enabled: bool,
    failing: AtomicBool,
    send_count: AtomicU64,
    sent: Mutex<Vec<EmailMessage>>,
}

impl MockEmailProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            failing: AtomicBool::new(false),
            send_count: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn sent_messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn last_message(&self) -> Option<EmailMessage> {
        self.sent_messages().pop()
    }
}

#[async_trait]
impl EmailProvider for MockEmailProvider {
    async fn send(&self, email: &EmailMessage) -> Result<(), EmailError> {
        if !self.enabled {
            return Err(EmailError::NotEnabled(
                "Mock email provider is not enabled".to_string(),
            ));
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmailError::SendFailed("mock transport failure".to_string()));
        }

        self.send_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "[MOCK] Email would be sent"
        );

        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            to: "client@example.lt".to_string(),
            subject: "Invoice SF000001".to_string(),
            body_text: "text".to_string(),
            body_html: "<p>html</p>".to_string(),
            attachment: Some(EmailAttachment::pdf("SF000001.pdf", b"%PDF-1.3".to_vec())),
        }
    }

    fn smtp_config(enabled: bool) -> SmtpConfig {
        SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            user: String::new(),
            password: String::new(),
            from_email: "noreply@example.com".to_string(),
            from_name: "Invoices".to_string(),
            enabled,
        }
    }

    #[tokio::test]
    async fn mock_records_sent_messages() {
        let provider = MockEmailProvider::new(true);
        provider.send(&message()).await.unwrap();
        assert_eq!(provider.send_count(), 1);
        assert_eq!(provider.last_message().unwrap().subject, "Invoice SF000001");
    }

    #[tokio::test]
    async fn failing_mock_does_not_count() {
        let provider = MockEmailProvider::new(true);
        provider.set_failing(true);
        assert!(provider.send(&message()).await.is_err());
        assert_eq!(provider.send_count(), 0);
    }

    #[tokio::test]
    async fn disabled_smtp_refuses_to_send() {
        let provider = SmtpEmailProvider::new(smtp_config(false)).unwrap();
        assert!(!provider.is_enabled());
        let err = provider.send(&message()).await.unwrap_err();
        assert!(matches!(err, EmailError::NotEnabled(_)));
    }

    #[test]
    fn builds_message_with_pdf_attachment() {
        let provider = SmtpEmailProvider::new(smtp_config(false)).unwrap();
        let built = provider.build_message(&message()).unwrap();
        let raw = String::from_utf8(built.formatted()).unwrap();
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("application/pdf"));
        assert!(raw.contains("SF000001.pdf"));
    }

    #[test]
    fn rejects_malformed_recipient() {
        let provider = SmtpEmailProvider::new(smtp_config(false)).unwrap();
        let mut bad = message();
        bad.to = "not an address".to_string();
        assert!(matches!(
            provider.build_message(&bad),
            Err(EmailError::InvalidRecipient(_))
        ));
    }
}
