mod common;

use common::{dead_url, StubServer};
use feed_digest::config::{SummarizerConfig, SummarizerKind};
use feed_digest::ingest::RawEntry;
use feed_digest::summarize::{
    CompletionSummarizer, RemoteModelSummarizer, Summarizer, SummaryOutcome, SUMMARY_UNAVAILABLE,
};

fn entry() -> RawEntry {
    RawEntry {
        feed_title: "The Register".into(),
        title: "SAP outage hits payroll".into(),
        summary: "Payroll stalled for thousands of staff.".into(),
        link: Some("https://x/1".into()),
        published: None,
    }
}

fn cfg(kind: SummarizerKind, endpoint: &str, key: Option<&str>) -> SummarizerConfig {
    SummarizerConfig {
        kind,
        endpoint: Some(endpoint.to_string()),
        max_retries: 2,
        retry_delay_secs: 0,
        timeout_secs: 5,
        api_key: key.map(str::to_string),
        ..SummarizerConfig::default()
    }
}

const HF_OK: &str = r#"[{"summary_text":"Payroll  was down.\nStaff unpaid."}]"#;

#[tokio::test]
async fn transient_then_success() {
    let server = StubServer::start(
        "application/json",
        vec![
            (503, r#"{"error":"Model is currently loading"}"#.into()),
            (200, HF_OK.into()),
        ],
    )
    .await;
    let s = RemoteModelSummarizer::from_config(&cfg(SummarizerKind::Huggingface, &server.url, Some("k")))
        .unwrap();

    let out = s.summarize(&entry()).await;
    assert_eq!(out, SummaryOutcome::Summarized("Payroll was down. Staff unpaid.".into()));
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn persistent_503_degrades_after_retry_budget() {
    let server = StubServer::start("application/json", vec![(503, "busy".into())]).await;
    let s = RemoteModelSummarizer::from_config(&cfg(SummarizerKind::Huggingface, &server.url, Some("k")))
        .unwrap();

    let out = s.summarize(&entry()).await;
    assert!(out.is_degraded());
    assert_eq!(out.text(), SUMMARY_UNAVAILABLE);
    assert_eq!(server.hits(), 3, "first attempt plus two retries");
}

#[tokio::test]
async fn bad_credentials_are_not_retried() {
    let server = StubServer::start("application/json", vec![(401, "unauthorized".into())]).await;
    let s = RemoteModelSummarizer::from_config(&cfg(SummarizerKind::Huggingface, &server.url, Some("bad")))
        .unwrap();

    let out = s.summarize(&entry()).await;
    assert!(out.is_degraded());
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn missing_key_degrades_without_a_request() {
    let server = StubServer::start("application/json", vec![(200, HF_OK.into())]).await;
    let s = RemoteModelSummarizer::from_config(&cfg(SummarizerKind::Huggingface, &server.url, None))
        .unwrap();

    assert!(s.summarize(&entry()).await.is_degraded());
    assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn unreachable_endpoint_degrades() {
    let url = dead_url().await;
    let s = RemoteModelSummarizer::from_config(&cfg(SummarizerKind::Huggingface, &url, Some("k")))
        .unwrap();
    let out = s.summarize(&entry()).await;
    assert!(out.is_degraded());
}

#[tokio::test]
async fn completion_backend_reads_first_choice() {
    let body = r#"{"choices":[{"message":{"role":"assistant","content":" SAP payroll outage. "}}]}"#;
    let server = StubServer::start("application/json", vec![(200, body.into())]).await;
    let s = CompletionSummarizer::from_config(&cfg(SummarizerKind::Openai, &server.url, Some("k")))
        .unwrap();

    let out = s.summarize(&entry()).await;
    assert_eq!(out, SummaryOutcome::Summarized("SAP payroll outage.".into()));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn completion_rate_limit_is_retried() {
    let ok = r#"{"choices":[{"message":{"content":"Short."}}]}"#;
    let server = StubServer::start(
        "application/json",
        vec![(429, "slow down".into()), (200, ok.into())],
    )
    .await;
    let s = CompletionSummarizer::from_config(&cfg(SummarizerKind::Openai, &server.url, Some("k")))
        .unwrap();

    assert_eq!(s.summarize(&entry()).await.text(), "Short.");
    assert_eq!(server.hits(), 2);
}
