//! Hosted summarization model (Hugging Face inference API request/response shape).

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

pub struct RemoteModelSummarizer {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    retry: FixedRetry,
    max_input_chars: usize,
}

#[derive(Serialize)]
struct Req<'a> {
    inputs: &'a str,
    parameters: Params,
}

#[derive(Serialize)]
struct Params {
    max_length: u32,
    min_length: u32,
    do_sample: bool,
}

/// The API answers with a list, but some deployments return a bare object.
#[derive(Deserialize)]
#[serde(untagged)]
enum Resp {
    List(Vec<Item>),
    One(Item),
}

#[derive(Deserialize)]
struct Item {
    #[serde(alias = "generated_text")]
    summary_text: String,
}

impl RemoteModelSummarizer {
    pub fn from_config(cfg: &SummarizerConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(Duration::from_secs(cfg.timeout_secs.max(1)))?,
            endpoint: cfg.endpoint_or_default().to_string(),
            api_key: cfg.api_key.clone(),
            retry: FixedRetry::new(
                cfg.max_retries.saturating_add(1),
                Duration::from_secs(cfg.retry_delay_secs),
            ),
            max_input_chars: cfg.max_input_chars.max(1),
        })
    }

    async fn request(&self, api_key: &str, text: &str) -> Result<String, SummarizeError> {
        let body = Req {
            inputs: text,
            parameters: Params {
                max_length: 130,
                min_length: 30,
                do_sample: false,
            },
        };
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
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

        let parsed: Resp = serde_json::from_str(&raw)
            .map_err(|e| SummarizeError::Hard(format!("malformed response: {e}")))?;
        let text = match parsed {
            Resp::List(items) => items.into_iter().next().map(|i| i.summary_text),
            Resp::One(item) => Some(item.summary_text),
        }
        .map(|t| sanitize_summary(&t))
        .unwrap_or_default();

        if text.is_empty() {
            return Err(SummarizeError::Hard("empty summary".into()));
        }
        Ok(text)
    }
}

#[async_trait]
impl Summarizer for RemoteModelSummarizer {
    async fn summarize(&self, entry: &RawEntry) -> SummaryOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            return SummaryOutcome::degraded("missing API key");
        };
        let text = prompt_text(entry, self.max_input_chars);

        match self
            .retry
            .run(
                "remote summarizer",
                |_| self.request(api_key, &text),
                SummarizeError::is_transient,
            )
            .await
        {
            Ok(summary) => SummaryOutcome::Summarized(summary),
            Err(ex) => {
                tracing::warn!(
                    summarizer = self.name(),
                    attempts = ex.attempts,
                    error = %ex.last,
                    title = %entry.title,
                    "summary unavailable"
                );
                SummaryOutcome::degraded(ex.last.to_string())
            }
        }
    }

    fn name(&self) -> &'static str {
        "remote-model"
    }
}
