// src/notify/mod.rs
pub mod email;

pub use email::{EmailNotifier, MailTransport, SmtpTransport, TlsMode};

use std::sync::Arc;

use crate::digest::DigestMessage;
use crate::error::Result;

/// Delivers a finished digest. A failed send must leave nothing half-delivered
/// that the caller would consider done.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, msg: &DigestMessage) -> Result<()>;
    fn name(&self) -> &'static str;
}

pub type DynNotifier = Arc<dyn Notifier>;

/// Dry-run notifier: prints the digest to stdout instead of mailing it.
#[derive(Debug, Clone, Default)]
pub struct StdoutNotifier;

#[async_trait::async_trait]
impl Notifier for StdoutNotifier {
    async fn send(&self, msg: &DigestMessage) -> Result<()> {
        tracing::info!(
            subject = %msg.subject,
            articles = msg.article_count,
            to = ?msg.to,
            "dry run: digest not mailed"
        );
        println!("Subject: {}\n\n{}", msg.subject, msg.preview());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}
