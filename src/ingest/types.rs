// src/ingest/types.rs
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Shown in place of a missing or unparsable entry timestamp.
pub const UNKNOWN_DATE: &str = "Unknown date";

/// A configured remote feed. Immutable after startup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedSource {
    pub url: String,
}

impl FeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Host part of the URL, used as a display name when the feed has no title.
    pub fn host(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| self.url.clone())
    }
}

/// One entry as produced by the feed parser. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub feed_title: String,
    pub title: String,
    pub summary: String,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

impl RawEntry {
    /// Title and description joined, the text keywords are matched against.
    pub fn match_text(&self) -> String {
        format!("{} {}", self.title, self.summary)
    }

    pub fn published_label(&self) -> String {
        self.published
            .map(|ts| ts.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| UNKNOWN_DATE.to_string())
    }
}

/// Feed metadata plus entries in feed-provided order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    pub title: String,
    pub entries: Vec<RawEntry>,
}

#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Retrieve and parse one feed. Any failure is a `FeedUnavailable`.
    async fn fetch(&self, source: &FeedSource) -> Result<ParsedFeed>;
    fn name(&self) -> &'static str;
}
