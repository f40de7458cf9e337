// src/summarize/mod.rs
//! Summarizer capability: one trait, several interchangeable backends.
//!
//! A summarizer never fails the caller. Remote problems come back as
//! `SummaryOutcome::Degraded` carrying the sentinel text, so the digest still
//! goes out and callers can tell a real summary from the fallback.

pub mod extractive;
pub mod openai;
pub mod remote_model;

pub use extractive::ExtractiveSummarizer;
pub use openai::CompletionSummarizer;
pub use remote_model::RemoteModelSummarizer;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{SummarizerConfig, SummarizerKind};
use crate::error::{DigestError, Result};
use crate::ingest::RawEntry;

/// Text used in the digest when no summary could be produced.
pub const SUMMARY_UNAVAILABLE: &str = "Summary unavailable.";

/// Longest summary kept, in chars.
pub const MAX_SUMMARY_CHARS: usize = 600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Summarized(String),
    Degraded { reason: String, text: String },
}

impl SummaryOutcome {
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self::Degraded {
            reason: reason.into(),
            text: SUMMARY_UNAVAILABLE.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Summarized(t) => t,
            Self::Degraded { text, .. } => text,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, entry: &RawEntry) -> SummaryOutcome;
    fn name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Remote call failure classes. Never leaves this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SummarizeError {
    /// Busy, rate limited, warming up: worth another attempt.
    Transient(String),
    /// Bad credentials, malformed response, anything else.
    Hard(String),
}

impl SummarizeError {
    pub(crate) fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl std::fmt::Display for SummarizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient(m) => write!(f, "transient: {m}"),
            Self::Hard(m) => write!(f, "hard: {m}"),
        }
    }
}

/// Build the configured backend.
pub fn build_summarizer(cfg: &SummarizerConfig) -> Result<DynSummarizer> {
    let summarizer: DynSummarizer = match cfg.kind {
        SummarizerKind::Extractive => Arc::new(ExtractiveSummarizer::new(cfg.max_sentences)),
        SummarizerKind::Huggingface => Arc::new(RemoteModelSummarizer::from_config(cfg)?),
        SummarizerKind::Openai => Arc::new(CompletionSummarizer::from_config(cfg)?),
    };
    if cfg.kind.api_key_env().is_some() && cfg.api_key.is_none() {
        tracing::warn!(
            summarizer = summarizer.name(),
            "no API key set; summaries will be unavailable"
        );
    }
    Ok(summarizer)
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("feed-digest/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5).min(timeout))
        .timeout(timeout)
        .build()
        .map_err(|e| DigestError::Config(format!("failed to create HTTP client: {e}")))
}

/// Text sent to remote backends: title plus description, capped.
pub(crate) fn prompt_text(entry: &RawEntry, max_chars: usize) -> String {
    let joined = if entry.summary.is_empty() {
        entry.title.clone()
    } else {
        format!("{}. {}", entry.title.trim_end_matches('.'), entry.summary)
    };
    joined.chars().take(max_chars).collect()
}

/// Single line, collapsed whitespace, capped length.
pub fn sanitize_summary(input: &str) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_SUMMARY_CHARS {
        return collapsed;
    }
    let mut out: String = collapsed.chars().take(MAX_SUMMARY_CHARS - 3).collect();
    out.push_str("...");
    out
}

/// Map a status code to a failure class. 429 and 503 mean "try again".
pub(crate) fn classify_status(status: reqwest::StatusCode, body: &str) -> SummarizeError {
    let snippet: String = body.chars().take(200).collect();
    let msg = format!("HTTP {status}: {snippet}");
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        || body.contains("currently loading")
    {
        SummarizeError::Transient(msg)
    } else {
        SummarizeError::Hard(msg)
    }
}

pub(crate) fn classify_request_error(e: &reqwest::Error) -> SummarizeError {
    if e.is_timeout() {
        SummarizeError::Transient(format!("timed out: {e}"))
    } else {
        SummarizeError::Hard(format!("request failed: {e}"))
    }
}
