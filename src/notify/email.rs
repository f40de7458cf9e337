// src/notify/email.rs
//! SMTP delivery with bounded login retry.
//!
//! Login is attempted up to `attempts` times with a fixed delay. When every
//! attempt fails the send is abandoned: no message is ever submitted over a
//! connection that did not authenticate.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, Message, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::AsyncSmtpTransport;
use lettre::{AsyncTransport, Tokio1Executor};
use serde::Deserialize;

use super::Notifier;
use crate::config::EmailConfig;
use crate::digest::{DigestBody, DigestMessage};
use crate::error::{DigestError, Result};
use crate::retry::FixedRetry;

const SMTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Implicit TLS (SMTPS).
    #[default]
    Wrapper,
    Starttls,
    /// Plaintext; local relays and tests only.
    None,
}

impl TlsMode {
    pub fn default_port(self) -> u16 {
        match self {
            Self::Wrapper => 465,
            Self::Starttls => 587,
            Self::None => 25,
        }
    }
}

/// The two SMTP steps the notifier sequences. Split out so the retry policy
/// can be exercised without a mail server.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Connect and log in, then disconnect.
    async fn authenticate(&self) -> Result<()>;
    async fn submit(&self, msg: &DigestMessage) -> Result<()>;
}

pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    pub fn from_config(cfg: &EmailConfig) -> Result<Self> {
        let host = cfg.smtp_host.as_str();
        let builder = match cfg.tls {
            TlsMode::Wrapper => AsyncSmtpTransport::<Tokio1Executor>::relay(host),
            TlsMode::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host),
            TlsMode::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)),
        }
        .map_err(|e| DigestError::Config(format!("invalid SMTP host {host:?}: {e}")))?;

        let mut builder = builder
            .port(cfg.port())
            .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECS)));
        if let Some(password) = &cfg.password {
            builder = builder.credentials(Credentials::new(cfg.username(), password.clone()));
        }
        Ok(Self {
            mailer: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn authenticate(&self) -> Result<()> {
        match self.mailer.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(DigestError::Transport(
                "SMTP server did not accept the connection".into(),
            )),
            Err(e) => Err(classify_smtp_error(e)),
        }
    }

    async fn submit(&self, msg: &DigestMessage) -> Result<()> {
        let email = build_message(msg)?;
        self.mailer
            .send(email)
            .await
            .map_err(classify_smtp_error)?;
        Ok(())
    }
}

/// 53x replies (530/534/535) are credential problems; everything else is transport.
fn classify_smtp_error(e: lettre::transport::smtp::Error) -> DigestError {
    let is_auth = e
        .status()
        .is_some_and(|code| code.to_string().starts_with("53"));
    if is_auth {
        DigestError::Authentication {
            attempts: 1,
            reason: e.to_string(),
        }
    } else {
        DigestError::Transport(e.to_string())
    }
}

pub fn build_message(msg: &DigestMessage) -> Result<Message> {
    let from: Mailbox = parse_mailbox(&msg.from)?;
    let mut builder = Message::builder().from(from).subject(msg.subject.clone());
    for to in &msg.to {
        builder = builder.to(parse_mailbox(to)?);
    }

    let built = match &msg.body {
        DigestBody::Text(text) => builder
            .header(ContentType::TEXT_PLAIN)
            .body(text.clone()),
        DigestBody::Html(html) => builder
            .header(ContentType::TEXT_HTML)
            .body(html.clone()),
        DigestBody::Alternative { text, html } => {
            builder.multipart(MultiPart::alternative_plain_html(text.clone(), html.clone()))
        }
    };
    built.map_err(|e| DigestError::Transport(format!("building message: {e}")))
}

fn parse_mailbox(s: &str) -> Result<Mailbox> {
    s.parse()
        .map_err(|e| DigestError::Config(format!("invalid mailbox {s:?}: {e}")))
}

/// Sends the digest by email, retrying login a fixed number of times.
pub struct EmailNotifier<T: MailTransport> {
    transport: T,
    login_retry: FixedRetry,
}

impl EmailNotifier<SmtpTransport> {
    pub fn from_config(cfg: &EmailConfig) -> Result<Self> {
        Ok(Self::new(
            SmtpTransport::from_config(cfg)?,
            FixedRetry::new(cfg.auth_attempts, cfg.auth_retry_delay()),
        ))
    }
}

impl<T: MailTransport> EmailNotifier<T> {
    pub fn new(transport: T, login_retry: FixedRetry) -> Self {
        Self {
            transport,
            login_retry,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<T: MailTransport> Notifier for EmailNotifier<T> {
    async fn send(&self, msg: &DigestMessage) -> Result<()> {
        self.login_retry
            .run("smtp login", |_| self.transport.authenticate(), |_| true)
            .await
            .map_err(|ex| match ex.last {
                DigestError::Authentication { reason, .. } => DigestError::Authentication {
                    attempts: ex.attempts,
                    reason,
                },
                other => other,
            })?;

        self.transport.submit(msg).await?;
        tracing::info!(
            subject = %msg.subject,
            articles = msg.article_count,
            recipients = msg.to.len(),
            "digest sent"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
