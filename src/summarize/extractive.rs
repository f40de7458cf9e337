use async_trait::async_trait;

use super::{sanitize_summary, SummaryOutcome, Summarizer};
use crate::ingest::RawEntry;

/// First `max_sentences` sentences of the description, else the title.
/// No network, never degrades.
#[derive(Debug, Clone)]
pub struct ExtractiveSummarizer {
    max_sentences: usize,
}

impl ExtractiveSummarizer {
    pub fn new(max_sentences: usize) -> Self {
        Self {
            max_sentences: max_sentences.max(1),
        }
    }

    pub fn lead_sentences(&self, text: &str) -> String {
        let text = text.trim();
        if text.is_empty() {
            return String::new();
        }
        let lead: Vec<&str> = text
            .split(". ")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .take(self.max_sentences)
            .collect();
        let mut out = lead.join(". ");
        if !out.ends_with(['.', '!', '?']) {
            out.push('.');
        }
        out
    }
}

impl Default for ExtractiveSummarizer {
    fn default() -> Self {
        Self::new(2)
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    async fn summarize(&self, entry: &RawEntry) -> SummaryOutcome {
        // empty description: use the title
        let mut lead = self.lead_sentences(&entry.summary);
        if lead.is_empty() {
            lead = entry.title.trim().to_string();
        }
        SummaryOutcome::Summarized(sanitize_summary(&lead))
    }

    fn name(&self) -> &'static str {
        "extractive"
    }
}
