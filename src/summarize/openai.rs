//! Chat-completion summarizer (OpenAI API shape). Reads its key from `OPENAI_API_KEY`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    classify_request_error, classify_status, http_client, prompt_text, sanitize_summary,
    SummarizeError, Summarizer, SummaryOutcome,
};
use crate::config::SummarizerConfig;
use crate::error::Result;
use crate::ingest::RawEntry;
use crate::retry::FixedRetry;

const SYSTEM_PROMPT: &str = "You summarize technology news for a busy reader. \
Return at most two plain sentences (under 60 words), neutral tone, no emojis, no preamble.";

pub struct CompletionSummarizer {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    retry: FixedRetry,
    max_input_chars: usize,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: Option<String>,
}

impl CompletionSummarizer {
    pub fn from_config(cfg: &SummarizerConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(Duration::from_secs(cfg.timeout_secs.max(1)))?,
            endpoint: cfg.endpoint_or_default().to_string(),
            model: cfg.model_or_default().to_string(),
            api_key: cfg.api_key.clone(),
            retry: FixedRetry::new(
                cfg.max_retries.saturating_add(1),
                Duration::from_secs(cfg.retry_delay_secs),
            ),
            max_input_chars: cfg.max_input_chars.max(1),
        })
    }

    async fn request(&self, api_key: &str, text: &str) -> Result<String, SummarizeError> {
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.2,
            max_tokens: 120,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| classify_request_error(&e))?;

        let status = resp.status();
        let raw = resp
            .text()
            .await
            .map_err(|e| classify_request_error(&e))?;
        if !status.is_success() {
            return Err(classify_status(status, &raw));
        }

        let body: Resp = serde_json::from_str(&raw)
            .map_err(|e| SummarizeError::Hard(format!("malformed response: {e}")))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        let cleaned = sanitize_summary(&content);
        if cleaned.is_empty() {
            return Err(SummarizeError::Hard("empty completion".into()));
        }
        Ok(cleaned)
    }
}

#[async_trait]
impl Summarizer for CompletionSummarizer {
    async fn summarize(&self, entry: &RawEntry) -> SummaryOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            return SummaryOutcome::degraded("missing API key");
        };
        let text = prompt_text(entry, self.max_input_chars);

        match self
            .retry
            .run(
                "completion summarizer",
                |_| self.request(api_key, &text),
                SummarizeError::is_transient,
            )
            .await
        {
            Ok(summary) => SummaryOutcome::Summarized(summary),
            Err(ex) => {
                tracing::warn!(
                    summarizer = self.name(),
                    model = %self.model,
                    attempts = ex.attempts,
                    error = %ex.last,
                    "summary unavailable"
                );
                SummaryOutcome::degraded(ex.last.to_string())
            }
        }
    }

    fn name(&self) -> &'static str {
        "completion"
    }
}
