// src/pipeline.rs
//! Run orchestration: fetch → match → dedupe → summarize → digest → send → persist.
//!
//! Strictly sequential: one feed at a time, one entry at a time. The identifier
//! set is written back only after the digest was sent, so a failed run offers
//! the same articles again next time.

use std::fmt;
use std::sync::Arc;

use chrono::Local;
use thiserror::Error;

use crate::dedup::{article_id, IdStrategy, SentIdStore};
use crate::digest::{ArticleRecord, DigestBuilder};
use crate::error::DigestError;
use crate::ingest::types::FeedFetcher;
use crate::ingest::FeedSource;
use crate::matcher::KeywordMatcher;
use crate::notify::Notifier;
use crate::summarize::Summarizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    LoadingState,
    Fetching,
    Filtering,
    Summarizing,
    BuildingDigest,
    Sending,
    PersistingState,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Idle => "idle",
            Stage::LoadingState => "loading-state",
            Stage::Fetching => "fetching",
            Stage::Filtering => "filtering",
            Stage::Summarizing => "summarizing",
            Stage::BuildingDigest => "building-digest",
            Stage::Sending => "sending",
            Stage::PersistingState => "persisting-state",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A run that ended in `Failed`, with the stage it failed in.
#[derive(Debug, Error)]
#[error("run failed while {stage}: {error}")]
pub struct RunFailure {
    pub stage: Stage,
    #[source]
    pub error: DigestError,
}

impl RunFailure {
    fn new(stage: Stage, error: DigestError) -> Self {
        enter(Stage::Failed);
        tracing::error!(%stage, error = %error, "run failed");
        Self { stage, error }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunOutcome {
    /// Nothing matched: no digest, no send, state untouched.
    #[default]
    NothingNew,
    Sent {
        articles: usize,
        subject: String,
        persisted: bool,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub feeds_ok: usize,
    pub feeds_failed: usize,
    pub entries_seen: usize,
    pub skipped_known: usize,
    pub matched: usize,
    pub summaries_degraded: usize,
}

impl RunReport {
    pub fn sent_articles(&self) -> usize {
        match self.outcome {
            RunOutcome::Sent { articles, .. } => articles,
            RunOutcome::NothingNew => 0,
        }
    }

    pub fn log(&self) {
        tracing::info!(
            feeds_ok = self.feeds_ok,
            feeds_failed = self.feeds_failed,
            entries = self.entries_seen,
            known = self.skipped_known,
            matched = self.matched,
            degraded = self.summaries_degraded,
            sent = self.sent_articles(),
            "run finished"
        );
    }
}

/// Everything a run needs, assembled once at startup.
pub struct PipelineParts {
    pub feeds: Vec<FeedSource>,
    pub fetcher: Arc<dyn FeedFetcher>,
    pub matcher: KeywordMatcher,
    pub summarizer: Arc<dyn Summarizer>,
    pub digest: DigestBuilder,
    pub notifier: Arc<dyn Notifier>,
    pub store: SentIdStore,
    pub id_strategy: IdStrategy,
    /// false in dry-run: send, but do not record anything.
    pub persist_state: bool,
}

pub struct Pipeline {
    parts: PipelineParts,
}

impl Pipeline {
    pub fn new(parts: PipelineParts) -> Self {
        Self { parts }
    }

    /// One complete run. State is loaded fresh each time.
    pub async fn run_once(&self) -> Result<RunReport, RunFailure> {
        let p = &self.parts;
        let mut report = RunReport::default();

        enter(Stage::LoadingState);
        let mut sent = p
            .store
            .load()
            .map_err(|e| RunFailure::new(Stage::LoadingState, e))?;

        let mut articles: Vec<ArticleRecord> = Vec::new();
        for source in &p.feeds {
            enter(Stage::Fetching);
            let feed = match p.fetcher.fetch(source).await {
                Ok(feed) => feed,
                Err(e) => {
                    tracing::warn!(
                        feed = %source.url,
                        fetcher = p.fetcher.name(),
                        error = %e,
                        "skipping feed"
                    );
                    report.feeds_failed += 1;
                    continue;
                }
            };
            report.feeds_ok += 1;

            enter(Stage::Filtering);
            for entry in &feed.entries {
                report.entries_seen += 1;
                let id = article_id(entry, p.id_strategy);
                if sent.is_known(&id) {
                    report.skipped_known += 1;
                    continue;
                }
                let keywords = p.matcher.matches(&entry.match_text());
                if keywords.is_empty() {
                    continue;
                }

                tracing::debug!(%id, title = %entry.title, ?keywords, "entry matched");
                enter(Stage::Summarizing);
                let summary = p.summarizer.summarize(entry).await;
                sent.record(id.clone());
                articles.push(ArticleRecord::new(entry, id, keywords, summary));
            }
        }
        report.matched = articles.len();
        report.summaries_degraded = articles.iter().filter(|a| a.summary_degraded).count();

        if articles.is_empty() {
            enter(Stage::Idle);
            tracing::info!("No relevant articles found.");
            return Ok(report);
        }

        enter(Stage::BuildingDigest);
        let message = p.digest.build(&articles, Local::now().date_naive());

        enter(Stage::Sending);
        p.notifier
            .send(&message)
            .await
            .map_err(|e| RunFailure::new(Stage::Sending, e))?;
        tracing::debug!(
            ids = ?articles.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(),
            "articles delivered"
        );

        if p.persist_state && sent.has_new() {
            enter(Stage::PersistingState);
            p.store
                .save(&sent)
                .map_err(|e| RunFailure::new(Stage::PersistingState, e))?;
        }

        enter(Stage::Idle);
        report.outcome = RunOutcome::Sent {
            articles: articles.len(),
            subject: message.subject,
            persisted: p.persist_state && sent.has_new(),
        };
        Ok(report)
    }
}

fn enter(stage: Stage) {
    tracing::trace!(%stage, "stage");
}
