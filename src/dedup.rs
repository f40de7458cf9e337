// src/dedup.rs
//! Article identifiers and the persisted set of already-sent identifiers.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{DigestError, Result};
use crate::ingest::RawEntry;

/// Tracking query parameters dropped before hashing a link.
const TRACKING_PARAMS: &[&str] = &["ref", "fbclid", "gclid", "mc_cid", "mc_eid"];

/// How an entry's stable identifier is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdStrategy {
    /// The trimmed canonical link.
    #[default]
    Link,
    /// SHA-256 of the normalized link; survives tracking params and `www.` variation.
    LinkHash,
}

/// Stable identifier for an entry. Entries without a link hash feed title + title.
pub fn article_id(entry: &RawEntry, strategy: IdStrategy) -> String {
    match (entry.link.as_deref(), strategy) {
        (Some(link), IdStrategy::Link) => link.trim().to_string(),
        (Some(link), IdStrategy::LinkHash) => {
            let normalized = normalize_url(link).unwrap_or_else(|| link.trim().to_string());
            sha256_hex(&normalized)
        }
        (None, _) => format!(
            "title:{}",
            sha256_hex(&format!("{}\n{}", entry.feed_title, entry.title))
        ),
    }
}

/// `host/path[?sorted_params]` without scheme, `www.`, trailing slash,
/// fragment or tracking params.
pub fn normalize_url(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw.trim()).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    let path = parsed.path().trim_end_matches('/');

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !k.starts_with("utm_") && !TRACKING_PARAMS.contains(&&**k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();

    let mut out = format!("{host}{path}");
    if !params.is_empty() {
        let qs: Vec<String> = params
            .iter()
            .map(|(k, v)| {
                if v.is_empty() {
                    k.clone()
                } else {
                    format!("{k}={v}")
                }
            })
            .collect();
        out.push('?');
        out.push_str(&qs.join("&"));
    }
    Some(out)
}

fn sha256_hex(s: &str) -> String {
    use std::fmt::Write as _;
    let digest = Sha256::digest(s.as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

/// Identifiers already processed, plus those added during the current run.
#[derive(Debug, Clone, Default)]
pub struct SentIdSet {
    known: HashSet<String>,
    added: usize,
}

impl SentIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.known.contains(id)
    }

    /// Add an identifier in memory. Returns false if it was already present.
    pub fn record(&mut self, id: impl Into<String>) -> bool {
        let inserted = self.known.insert(id.into());
        if inserted {
            self.added += 1;
        }
        inserted
    }

    /// Number of identifiers recorded since load.
    pub fn added(&self) -> usize {
        self.added
    }

    pub fn has_new(&self) -> bool {
        self.added > 0
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.known.iter().map(String::as_str)
    }

    fn sorted(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.iter().collect();
        ids.sort_unstable();
        ids
    }
}

impl FromIterator<String> for SentIdSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self {
            known: iter.into_iter().collect(),
            added: 0,
        }
    }
}

/// JSON-array file holding every identifier ever sent.
#[derive(Debug, Clone)]
pub struct SentIdStore {
    path: PathBuf,
}

impl SentIdStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file → empty set. Unreadable or malformed file → `StateCorrupt`.
    pub fn load(&self) -> Result<SentIdSet> {
        let data = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no prior state, starting empty");
                return Ok(SentIdSet::new());
            }
            Err(e) => return Err(self.corrupt(e)),
        };
        let ids: Vec<String> = serde_json::from_str(&data).map_err(|e| self.corrupt(e))?;
        let set: SentIdSet = ids.into_iter().collect();
        tracing::debug!(path = %self.path.display(), ids = set.len(), "state loaded");
        Ok(set)
    }

    /// Overwrite the file with the full set via temp file + rename.
    pub fn save(&self, set: &SentIdSet) -> Result<()> {
        self.write_atomic(set).map_err(|source| DigestError::StateWrite {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), ids = set.len(), "state saved");
        Ok(())
    }

    fn write_atomic(&self, set: &SentIdSet) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(&set.sorted())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let tmp = self.tmp_path();
        let mut f = fs::File::create(&tmp)?;
        f.write_all(&json)?;
        f.sync_all()?;
        drop(f);
        fs::rename(&tmp, &self.path)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "sent_ids.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn corrupt(&self, reason: impl ToString) -> DigestError {
        DigestError::StateCorrupt {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}
