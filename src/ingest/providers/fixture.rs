use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{DigestError, Result};
use crate::ingest::parser::parse_feed;
use crate::ingest::types::{FeedFetcher, FeedSource, ParsedFeed};

/// Serves feed documents from memory, keyed by URL. Unknown URLs are unavailable.
#[derive(Debug, Clone, Default)]
pub struct StaticFeedFetcher {
    docs: HashMap<String, String>,
}

impl StaticFeedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, url: impl Into<String>, xml: impl Into<String>) -> Self {
        self.docs.insert(url.into(), xml.into());
        self
    }
}

#[async_trait]
impl FeedFetcher for StaticFeedFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<ParsedFeed> {
        let xml = self
            .docs
            .get(&source.url)
            .ok_or_else(|| DigestError::feed(&source.url, "no such fixture"))?;
        parse_feed(xml, &source.host()).map_err(|e| DigestError::feed(&source.url, e))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
