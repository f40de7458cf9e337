// src/bootstrap.rs
use std::sync::Arc;

use tracing::info;

use crate::config::AppConfig;
use crate::dedup::SentIdStore;
use crate::digest::DigestBuilder;
use crate::error::Result;
use crate::ingest::{FeedFetcher, FeedSource, HttpFeedFetcher};
use crate::matcher::KeywordMatcher;
use crate::notify::{DynNotifier, EmailNotifier, StdoutNotifier};
use crate::pipeline::{Pipeline, PipelineParts};
use crate::summarize::build_summarizer;

/// Wire production components from a validated config.
pub fn build_pipeline(cfg: &AppConfig) -> Result<Pipeline> {
    let fetcher = Arc::new(HttpFeedFetcher::new()?);
    let summarizer = build_summarizer(&cfg.summarizer)?;
    let notifier: DynNotifier = if cfg.email.dry_run {
        Arc::new(StdoutNotifier)
    } else {
        Arc::new(EmailNotifier::from_config(&cfg.email)?)
    };

    // Safe diagnostics only: never the password or API key itself
    info!(
        feeds = cfg.feeds.len(),
        keywords = cfg.keywords.list.len(),
        fetcher = fetcher.name(),
        summarizer = summarizer.name(),
        notifier = notifier.name(),
        smtp_host = %cfg.email.smtp_host,
        smtp_port = cfg.email.port(),
        state = %cfg.state.path.display(),
        dry_run = cfg.email.dry_run,
        "pipeline configured"
    );

    let digest = DigestBuilder::new(cfg.email.from.clone(), cfg.email.to.clone())
        .with_format(cfg.email.format)
        .with_subject_prefix(cfg.email.subject_prefix.clone())
        .with_date(cfg.email.include_date);

    Ok(Pipeline::new(PipelineParts {
        feeds: cfg.feeds.iter().map(FeedSource::new).collect(),
        fetcher,
        matcher: KeywordMatcher::new(&cfg.keywords.list, &cfg.keywords.whole_word),
        summarizer,
        digest,
        notifier,
        store: SentIdStore::new(cfg.state.path.clone()),
        id_strategy: cfg.state.id_strategy,
        persist_state: !cfg.email.dry_run,
    }))
}
