// src/error.rs
//! Error taxonomy for a digest run.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = DigestError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DigestError {
    /// A single feed could not be fetched or parsed. Recovered by skipping the feed.
    #[error("feed {url} unavailable: {reason}")]
    FeedUnavailable { url: String, reason: String },

    /// The persisted identifier set exists but cannot be parsed. Never reset silently.
    #[error("state file {} is corrupt: {reason}", path.display())]
    StateCorrupt { path: PathBuf, reason: String },

    #[error("state file {} could not be written: {source}", path.display())]
    StateWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SMTP authentication failed after {attempts} attempt(s): {reason}")]
    Authentication { attempts: u32, reason: String },

    #[error("mail transport error: {0}")]
    Transport(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DigestError {
    pub fn feed(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::FeedUnavailable {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures that must stop a recurring schedule as well as the current run.
    pub fn needs_operator(&self) -> bool {
        matches!(self, Self::StateCorrupt { .. } | Self::Config(_))
    }
}
