use std::time::{Duration, Instant};

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::error::{DigestError, Result};
use crate::ingest::parser::parse_feed;
use crate::ingest::types::{FeedFetcher, FeedSource, ParsedFeed};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const TOTAL_TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 5;
/// Feeds larger than this are refused.
pub const MAX_FEED_BYTES: usize = 5 * 1024 * 1024;

const USER_AGENT: &str = concat!("feed-digest/", env!("CARGO_PKG_VERSION"), " (RSS reader)");

/// Fetches feeds over HTTP(S).
pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(TOTAL_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DigestError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<ParsedFeed> {
        let t0 = Instant::now();
        let url = source.url.as_str();

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DigestError::feed(url, format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DigestError::feed(url, format!("HTTP status {status}")));
        }
        if resp
            .content_length()
            .is_some_and(|len| len > MAX_FEED_BYTES as u64)
        {
            return Err(DigestError::feed(url, "feed too large"));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| DigestError::feed(url, format!("reading body: {e}")))?;
        if bytes.len() > MAX_FEED_BYTES {
            return Err(DigestError::feed(url, "feed too large"));
        }

        let body = decode_body(&bytes, content_type.as_deref());
        let feed = parse_feed(&body, &source.host()).map_err(|e| DigestError::feed(url, e))?;

        tracing::debug!(
            feed = url,
            entries = feed.entries.len(),
            ms = t0.elapsed().as_millis() as u64,
            "feed fetched"
        );
        Ok(feed)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Decode a feed body. Precedence: byte-order mark, HTTP `charset`, the XML
/// declaration's `encoding`, then UTF-8. Undecodable bytes become U+FFFD.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = Encoding::for_bom(bytes)
        .map(|(enc, _)| enc)
        .or_else(|| {
            content_type
                .and_then(charset_param)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .or_else(|| declared_encoding(bytes))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    static RE_DECL: OnceCell<Regex> = OnceCell::new();
    let re = RE_DECL.get_or_init(|| {
        Regex::new(r#"^\s*<\?xml[^>]*\bencoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#)
            .expect("xml declaration regex")
    });
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
    let label = re.captures(&head)?.get(1)?;
    Encoding::for_label(label.as_str().as_bytes())
}
