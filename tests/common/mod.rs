#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use feed_digest::dedup::{IdStrategy, SentIdStore};
use feed_digest::digest::{DigestBuilder, DigestMessage};
use feed_digest::error::{DigestError, Result};
use feed_digest::ingest::{FeedFetcher, FeedSource, StaticFeedFetcher};
use feed_digest::matcher::KeywordMatcher;
use feed_digest::notify::Notifier;
use feed_digest::summarize::{ExtractiveSummarizer, Summarizer};
use feed_digest::{Pipeline, PipelineParts};

pub const KEYWORDS: &[&str] = &["SAP", "HMRC", "BTP", "S/4HANA", "Sovereign"];

/// Minimal RSS 2.0 document from `(title, link, description)` triples.
pub fn rss(channel: &str, items: &[(&str, &str, &str)]) -> String {
    let mut out = format!(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>{channel}</title>"
    );
    for (title, link, desc) in items {
        out.push_str(&format!(
            "<item><title>{title}</title><link>{link}</link><description>{desc}</description>\
             <pubDate>Mon, 06 Jan 2025 09:30:00 +0000</pubDate></item>"
        ));
    }
    out.push_str("</channel></rss>");
    out
}

// ---------- scripted HTTP stub ----------

/// One-shot HTTP/1.1 server on loopback. Each connection gets the next scripted
/// response; the last one repeats once the script runs out.
pub struct StubServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl StubServer {
    pub async fn start(content_type: &'static str, script: Vec<(u16, String)>) -> Self {
        assert!(!script.is_empty(), "stub needs at least one response");
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    return;
                };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = script[n.min(script.len() - 1)].clone();
                read_request(&mut sock).await;
                let head = format!(
                    "HTTP/1.1 {status} {}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    reason(status),
                    body.len()
                );
                let _ = sock.write_all(head.as_bytes()).await;
                let _ = sock.write_all(body.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });

        Self {
            url: format!("http://{addr}/"),
            hits,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Consume headers plus a Content-Length body so the client sees a clean exchange.
async fn read_request(sock: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let Ok(n) = sock.read(&mut chunk).await else {
            return;
        };
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find(&buf, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let want = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + want {
                return;
            }
        }
    }
}

fn find(hay: &[u8], needle: &[u8]) -> Option<usize> {
    hay.windows(needle.len()).position(|w| w == needle)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

/// A loopback address nothing listens on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

// ---------- scripted SMTP stub ----------

/// Loopback ESMTP server with just enough of the protocol for lettre over
/// plaintext. `AUTH` gets `auth_reply`; command counts are recorded.
pub struct SmtpStub {
    pub port: u16,
    auths: Arc<AtomicUsize>,
    mails: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<String>>>,
}

impl SmtpStub {
    pub async fn start(auth_reply: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let stub = Self {
            port,
            auths: Arc::new(AtomicUsize::new(0)),
            mails: Arc::new(AtomicUsize::new(0)),
            bodies: Arc::new(Mutex::new(Vec::new())),
        };
        let (auths, mails, bodies) = (stub.auths.clone(), stub.mails.clone(), stub.bodies.clone());

        tokio::spawn(async move {
            loop {
                let Ok((sock, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(serve_smtp(
                    sock,
                    auth_reply,
                    auths.clone(),
                    mails.clone(),
                    bodies.clone(),
                ));
            }
        });
        stub
    }

    pub fn auths(&self) -> usize {
        self.auths.load(Ordering::SeqCst)
    }

    pub fn mails(&self) -> usize {
        self.mails.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().unwrap().clone()
    }
}

async fn serve_smtp(
    sock: TcpStream,
    auth_reply: &'static str,
    auths: Arc<AtomicUsize>,
    mails: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<String>>>,
) {
    let (read, mut write) = sock.into_split();
    let mut lines = BufReader::new(read).lines();
    if write.write_all(b"220 localhost ESMTP stub\r\n").await.is_err() {
        return;
    }

    let mut in_data = false;
    let mut body = String::new();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim_end_matches('\r');
        if in_data {
            if line == "." {
                in_data = false;
                bodies.lock().unwrap().push(std::mem::take(&mut body));
                let _ = write.write_all(b"250 2.0.0 queued\r\n").await;
            } else {
                body.push_str(line);
                body.push('\n');
            }
            continue;
        }

        let verb = line
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        let reply = match verb.as_str() {
            "EHLO" => "250-localhost\r\n250-AUTH PLAIN LOGIN\r\n250 8BITMIME",
            "HELO" => "250 localhost",
            "AUTH" => {
                auths.fetch_add(1, Ordering::SeqCst);
                auth_reply
            }
            "MAIL" => {
                mails.fetch_add(1, Ordering::SeqCst);
                "250 2.1.0 OK"
            }
            "RCPT" => "250 2.1.5 OK",
            "DATA" => {
                in_data = true;
                "354 end data with <CR><LF>.<CR><LF>"
            }
            "QUIT" => {
                let _ = write.write_all(b"221 2.0.0 bye\r\n").await;
                return;
            }
            _ => "250 2.0.0 OK",
        };
        if write
            .write_all(format!("{reply}\r\n").as_bytes())
            .await
            .is_err()
        {
            return;
        }
    }
}

// ---------- notifier doubles ----------

/// Records every digest it is asked to send. Optionally fails instead.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<DigestMessage>>,
    pub attempts: AtomicUsize,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<DigestMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, msg: &DigestMessage) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DigestError::Authentication {
                attempts: 3,
                reason: "535 authentication failed".into(),
            });
        }
        self.sent.lock().unwrap().push(msg.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

// ---------- pipeline assembly ----------

pub fn parts(
    feeds: &[&str],
    fetcher: Arc<dyn FeedFetcher>,
    notifier: Arc<dyn Notifier>,
    state: &Path,
) -> PipelineParts {
    PipelineParts {
        feeds: feeds.iter().map(|u| FeedSource::new(*u)).collect(),
        fetcher,
        matcher: KeywordMatcher::new(KEYWORDS, &["SAP"]),
        summarizer: Arc::new(ExtractiveSummarizer::new(2)) as Arc<dyn Summarizer>,
        digest: DigestBuilder::new("Digest <digest@example.com>", vec!["me@example.com".into()]),
        notifier,
        store: SentIdStore::new(state),
        id_strategy: IdStrategy::Link,
        persist_state: true,
    }
}

pub fn static_pipeline(
    url: &str,
    xml: String,
    notifier: Arc<dyn Notifier>,
    state: &Path,
) -> Pipeline {
    let fetcher = Arc::new(StaticFeedFetcher::new().with_feed(url, xml));
    Pipeline::new(parts(&[url], fetcher, notifier, state))
}
