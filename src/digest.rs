// src/digest.rs
//! Digest rendering: matched articles → one message.

use chrono::NaiveDate;
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Deserialize;

use crate::ingest::RawEntry;
use crate::summarize::SummaryOutcome;

/// One matched, summarized entry. Built once per run, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub id: String,
    pub feed_title: String,
    pub title: String,
    pub link: Option<String>,
    pub published: String,
    pub keywords: Vec<String>,
    pub summary: String,
    pub summary_degraded: bool,
}

impl ArticleRecord {
    pub fn new(entry: &RawEntry, id: String, keywords: Vec<String>, summary: SummaryOutcome) -> Self {
        Self {
            id,
            feed_title: entry.feed_title.clone(),
            title: entry.title.clone(),
            link: entry.link.clone(),
            published: entry.published_label(),
            keywords,
            summary_degraded: summary.is_degraded(),
            summary: summary.text().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestFormat {
    #[default]
    Text,
    Html,
    /// multipart/alternative with both renderings
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestBody {
    Text(String),
    Html(String),
    Alternative { text: String, html: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: DigestBody,
    pub article_count: usize,
}

impl DigestMessage {
    /// Plain-text rendering if present, else the HTML.
    pub fn preview(&self) -> &str {
        match &self.body {
            DigestBody::Text(t) => t,
            DigestBody::Html(h) => h,
            DigestBody::Alternative { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DigestBuilder {
    from: String,
    to: Vec<String>,
    format: DigestFormat,
    subject_prefix: String,
    include_date: bool,
}

impl DigestBuilder {
    pub fn new(from: impl Into<String>, to: Vec<String>) -> Self {
        Self {
            from: from.into(),
            to,
            format: DigestFormat::Text,
            subject_prefix: "Website Monitor Digest".to_string(),
            include_date: true,
        }
    }

    pub fn with_format(mut self, format: DigestFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = prefix.into();
        self
    }

    pub fn with_date(mut self, include: bool) -> Self {
        self.include_date = include;
        self
    }

    /// Render the digest. Callers must not pass an empty slice; an empty run sends nothing.
    pub fn build(&self, articles: &[ArticleRecord], today: NaiveDate) -> DigestMessage {
        let subject = self.subject(articles.len(), today);
        let body = match self.format {
            DigestFormat::Text => DigestBody::Text(render_text(articles)),
            DigestFormat::Html => DigestBody::Html(render_html(&subject, articles)),
            DigestFormat::Both => DigestBody::Alternative {
                text: render_text(articles),
                html: render_html(&subject, articles),
            },
        };
        DigestMessage {
            from: self.from.clone(),
            to: self.to.clone(),
            subject,
            body,
            article_count: articles.len(),
        }
    }

    pub fn subject(&self, count: usize, today: NaiveDate) -> String {
        let noun = if count == 1 { "article" } else { "articles" };
        let mut s = format!("{}: {count} new {noun}", self.subject_prefix);
        if self.include_date {
            s.push_str(&format!(" ({})", today.format("%Y-%m-%d")));
        }
        s
    }
}

pub fn render_text(articles: &[ArticleRecord]) -> String {
    articles
        .iter()
        .map(|a| {
            format!(
                "📰 {}\nSource: {} | {}\nMatched keywords: {}\n{}\n{}\n",
                a.title,
                a.feed_title,
                a.published,
                a.keywords.join(", "),
                a.summary,
                a.link.as_deref().unwrap_or("(no link)")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_html(subject: &str, articles: &[ArticleRecord]) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>");
    out.push_str(&encode_text(subject));
    out.push_str("</title></head>\n<body style=\"font-family:sans-serif\">\n<h2>");
    out.push_str(&encode_text(subject));
    out.push_str("</h2>\n");

    for a in articles {
        out.push_str("<div class=\"article\" style=\"margin-bottom:1.5em\">\n<h3>");
        match a.link.as_deref() {
            Some(link) => {
                out.push_str("<a href=\"");
                out.push_str(&encode_double_quoted_attribute(link));
                out.push_str("\">");
                out.push_str(&encode_text(&a.title));
                out.push_str("</a>");
            }
            None => out.push_str(&encode_text(&a.title)),
        }
        out.push_str("</h3>\n<p class=\"meta\" style=\"color:#666\">");
        out.push_str(&encode_text(&a.feed_title));
        out.push_str(" | ");
        out.push_str(&encode_text(&a.published));
        out.push_str("</p>\n<p class=\"keywords\"><strong>Matched keywords:</strong> ");
        out.push_str(&encode_text(&a.keywords.join(", ")));
        out.push_str("</p>\n<p class=\"summary\">");
        out.push_str(&encode_text(&a.summary));
        out.push_str("</p>\n</div>\n");
    }

    out.push_str("</body></html>\n");
    out
}
