// src/ingest/parser.rs
//! RSS 2.0, RSS 1.0 (RDF) and Atom parsing into `ParsedFeed`.

use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use once_cell::sync::OnceCell;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::clean_text;
use crate::ingest::types::{ParsedFeed, RawEntry};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "dc:date")]
    dc_date: Option<String>,
}

/// RSS 1.0: items are siblings of the channel under `rdf:RDF`.
#[derive(Debug, Deserialize)]
struct Rdf {
    channel: Option<RdfChannel>,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RdfChannel {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    title: Option<TextNode>,
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<TextNode>,
    content: Option<TextNode>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Element whose attributes (`type="html"`) we do not care about.
#[derive(Debug, Default, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    text: String,
}

fn text_of(node: Option<TextNode>) -> String {
    node.map(|n| n.text).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    Rss,
    Rdf,
    Atom,
}

/// Parse a feed document. `fallback_title` is used when the feed carries no title.
pub fn parse_feed(xml: &str, fallback_title: &str) -> anyhow::Result<ParsedFeed> {
    let xml = scrub_html_entities_for_xml(xml);
    let feed = match sniff_kind(&xml)? {
        FeedKind::Rss => {
            let rss: Rss = from_str(&xml).map_err(|e| anyhow::anyhow!("parsing rss xml: {e}"))?;
            let title = display_title(rss.channel.title.as_deref(), fallback_title);
            let entries = rss_entries(rss.channel.items, &title);
            ParsedFeed { title, entries }
        }
        FeedKind::Rdf => {
            let rdf: Rdf = from_str(&xml).map_err(|e| anyhow::anyhow!("parsing rdf xml: {e}"))?;
            let channel_title = rdf.channel.and_then(|c| c.title);
            let title = display_title(channel_title.as_deref(), fallback_title);
            let entries = rss_entries(rdf.items, &title);
            ParsedFeed { title, entries }
        }
        FeedKind::Atom => {
            let atom: AtomFeed =
                from_str(&xml).map_err(|e| anyhow::anyhow!("parsing atom xml: {e}"))?;
            let feed_title = text_of(atom.title);
            let title = display_title(Some(&feed_title), fallback_title);
            let xhtml = atom_xhtml_bodies(&xml);
            let entries = atom
                .entries
                .into_iter()
                .enumerate()
                .filter_map(|(i, e)| atom_entry(e, xhtml.get(i).cloned().flatten(), &title))
                .collect();
            ParsedFeed { title, entries }
        }
    };
    Ok(feed)
}

fn sniff_kind(xml: &str) -> anyhow::Result<FeedKind> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = e.local_name();
                return match name.as_ref() {
                    b"rss" => Ok(FeedKind::Rss),
                    b"RDF" => Ok(FeedKind::Rdf),
                    b"feed" => Ok(FeedKind::Atom),
                    other => Err(anyhow::anyhow!(
                        "unsupported feed root element <{}>",
                        String::from_utf8_lossy(other)
                    )),
                };
            }
            Ok(Event::Eof) => anyhow::bail!("document has no root element"),
            Ok(_) => continue,
            Err(e) => anyhow::bail!("malformed xml: {e}"),
        }
    }
}

fn display_title(raw: Option<&str>, fallback: &str) -> String {
    let t = raw.map(clean_text).unwrap_or_default();
    if t.is_empty() {
        fallback.to_string()
    } else {
        t
    }
}

fn rss_entries(items: Vec<RssItem>, feed_title: &str) -> Vec<RawEntry> {
    items
        .into_iter()
        .filter_map(|it| {
            let title = clean_text(it.title.as_deref().unwrap_or_default());
            let summary = clean_text(it.description.as_deref().unwrap_or_default());
            if title.is_empty() && summary.is_empty() {
                return None;
            }
            let date = it.pub_date.or(it.dc_date);
            Some(RawEntry {
                feed_title: feed_title.to_string(),
                title,
                summary,
                link: non_empty(it.link),
                published: date.as_deref().and_then(parse_timestamp),
            })
        })
        .collect()
}

fn atom_entry(e: AtomEntry, xhtml: Option<String>, feed_title: &str) -> Option<RawEntry> {
    let title = clean_text(&text_of(e.title));
    let mut summary = clean_text(&text_of(e.summary));
    if summary.is_empty() {
        summary = clean_text(&text_of(e.content));
    }
    if summary.is_empty() {
        summary = xhtml.as_deref().map(clean_text).unwrap_or_default();
    }
    if title.is_empty() && summary.is_empty() {
        return None;
    }

    // rel defaults to "alternate" when absent
    let link = e
        .links
        .iter()
        .find(|l| l.rel.as_deref().unwrap_or("alternate") == "alternate")
        .or_else(|| e.links.first())
        .and_then(|l| l.href.clone());

    let date = e.published.or(e.updated);
    Some(RawEntry {
        feed_title: feed_title.to_string(),
        title,
        summary,
        link: non_empty(link),
        published: date.as_deref().and_then(parse_timestamp),
    })
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// RFC 2822 (RSS) or RFC 3339 (Atom, Dublin Core). Unparsable → `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let parsed = OffsetDateTime::parse(raw, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(raw, &Rfc3339))
        .ok()?;
    DateTime::<Utc>::from_timestamp(parsed.unix_timestamp(), 0)
}

/// HTML named entities are not valid XML. Replace each one with its character,
/// re-escaped for XML; names HTML does not know either become literal text.
fn scrub_html_entities_for_xml(s: &str) -> String {
    static RE_ENTITY: OnceCell<Regex> = OnceCell::new();
    let re = RE_ENTITY
        .get_or_init(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").expect("entity regex"));
    re.replace_all(s, |caps: &regex::Captures<'_>| {
        let whole = &caps[0];
        if XML_ENTITIES.contains(&&caps[1]) {
            return whole.to_string();
        }
        let decoded = html_escape::decode_html_entities(whole);
        if decoded == whole {
            format!("&amp;{}", &whole[1..])
        } else {
            html_escape::encode_quoted_attribute(&decoded).into_owned()
        }
    })
    .into_owned()
}

const XML_ENTITIES: &[&str] = &["amp", "lt", "gt", "quot", "apos"];

/// Text of every `<content type="xhtml">` body, one slot per `<entry>` in
/// document order. Serde only sees the direct text of an element, so the
/// nested markup is walked here.
fn atom_xhtml_bodies(xml: &str) -> Vec<Option<String>> {
    let mut reader = Reader::from_str(xml);
    let mut bodies: Vec<Option<String>> = Vec::new();
    let mut depth: usize = 0;
    let mut buf = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if depth > 0 {
                    depth += 1;
                } else if e.local_name().as_ref() == b"entry" {
                    bodies.push(None);
                } else if e.local_name().as_ref() == b"content" && is_xhtml(&e) {
                    depth = 1;
                    buf.clear();
                }
            }
            Ok(Event::End(_)) if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(slot) = bodies.last_mut() {
                        *slot = Some(std::mem::take(&mut buf));
                    }
                }
            }
            Ok(Event::Text(t)) if depth > 0 => {
                if let Ok(text) = t.unescape() {
                    buf.push_str(&text);
                    buf.push(' ');
                }
            }
            Ok(Event::CData(c)) if depth > 0 => {
                buf.push_str(&String::from_utf8_lossy(&c));
                buf.push(' ');
            }
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
    }
    bodies
}

fn is_xhtml(e: &BytesStart<'_>) -> bool {
    matches!(e.try_get_attribute("type"), Ok(Some(a)) if a.value.as_ref() == b"xhtml")
}
