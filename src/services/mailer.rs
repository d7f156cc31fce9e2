//! Outgoing mail
//!
//! Callers build a [`MailMessage`] naming a template and a context; the
//! configured [`Mailer`] renders and delivers it. Delivery is attempted once,
//! failures are returned to the caller.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::{MailBackend, MailConfig};

/// Template used for invitation (account activation) mail
pub const INVITE_TEMPLATE: &str = "invite";

/// Template used for password reset mail
pub const PASSWORD_RESET_TEMPLATE: &str = "password_reset";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("unknown mail template '{0}'")]
    UnknownTemplate(String),

    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("delivery failed: {0}")]
    Transport(String),
}

/// A message ready to be rendered and sent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailMessage {
    pub template_name: String,
    pub from_address: String,
    pub to_addresses: Vec<String>,
    pub context: Map<String, Value>,
}

impl MailMessage {
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context.get(key).and_then(Value::as_str)
    }
}

/// Subject and plain-text body produced by a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
    pub subject: String,
    pub body: String,
}

/// Render a message from its template and context
pub fn render(message: &MailMessage) -> Result<RenderedMail, MailError> {
    let get = |key: &str| message.context_str(key).unwrap_or_default();
    let link = |path_key: &str| format!("{}://{}/{}", get("protocol"), get("domain"), get(path_key));

    match message.template_name.as_str() {
        INVITE_TEMPLATE => Ok(RenderedMail {
            subject: format!("You have been invited to {}", get("site_name")),
            body: format!(
                "Hello,\n\n\
                 An account has been created for you on {site}.\n\
                 Activate it by opening the link below:\n\n\
                 {link}\n\n\
                 The link can be used once and expires after a day.\n\n\
                 The {site} team\n",
                site = get("site_name"),
                link = link("activation_path"),
            ),
        }),
        PASSWORD_RESET_TEMPLATE => Ok(RenderedMail {
            subject: format!("Password reset on {}", get("site_name")),
            body: format!(
                "Hello,\n\n\
                 You asked to reset your password on {site}.\n\
                 Choose a new one by opening the link below:\n\n\
                 {link}\n\n\
                 If you did not ask for this, ignore this message.\n\n\
                 The {site} team\n",
                site = get("site_name"),
                link = link("password_reset_path"),
            ),
        }),
        other => Err(MailError::UnknownTemplate(other.to_string())),
    }
}

/// Mail-sending capability
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Delivers mail through an SMTP relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let host = config
            .smtp_host
            .as_deref()
            .context("mail.smtp_host is required for the smtp backend")?;

        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        }
        .with_context(|| format!("Invalid SMTP relay '{}'", host))?
        .port(config.smtp_port);

        let builder = match (&config.smtp_username, &config.smtp_password) {
            (Some(user), Some(pass)) => {
                builder.credentials(Credentials::new(user.clone(), pass.clone()))
            }
            _ => builder,
        };

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let rendered = render(message)?;

        let from: Mailbox = message
            .from_address
            .parse()
            .map_err(|_| MailError::InvalidAddress(message.from_address.clone()))?;
        let mut builder = Message::builder()
            .from(from)
            .subject(rendered.subject)
            .header(ContentType::TEXT_PLAIN);
        for to in &message.to_addresses {
            let mailbox: Mailbox = to
                .parse()
                .map_err(|_| MailError::InvalidAddress(to.clone()))?;
            builder = builder.to(mailbox);
        }
        let email = builder
            .body(rendered.body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        info!(
            template = %message.template_name,
            recipients = message.to_addresses.len(),
            "Mail delivered"
        );
        Ok(())
    }
}

/// Renders and logs messages without delivering them
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let rendered = render(message)?;
        info!(
            template = %message.template_name,
            to = ?message.to_addresses,
            subject = %rendered.subject,
            "Mail not delivered (log backend)"
        );
        // the body carries live activation and reset links
        debug!(template = %message.template_name, body = %rendered.body, "Mail body");
        Ok(())
    }
}

/// Keeps sent messages in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<MailMessage>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn outbox(&self) -> Vec<MailMessage> {
        self.outbox.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.outbox.lock().await.clear();
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        render(message)?;
        self.outbox.lock().await.push(message.clone());
        Ok(())
    }
}

/// Build the mailer selected by the configuration
pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    Ok(match config.backend {
        MailBackend::Smtp => Arc::new(SmtpMailer::new(config)?),
        MailBackend::Log => Arc::new(LogMailer),
        MailBackend::Memory => Arc::new(MemoryMailer::new()),
    })
}
