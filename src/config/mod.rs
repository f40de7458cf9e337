// src/config/mod.rs
//! Application configuration: TOML file + environment overrides + secrets.

pub mod summarizer;

pub use summarizer::{SummarizerConfig, SummarizerKind};

use anyhow::{anyhow, bail, Context, Result};
use lettre::message::Mailbox;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dedup::IdStrategy;
use crate::digest::DigestFormat;
use crate::notify::email::TlsMode;

pub const DEFAULT_CONFIG_PATH: &str = "config/digest.toml";

pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const ENV_STATE_PATH: &str = "DIGEST_STATE_PATH";
pub const ENV_DRY_RUN: &str = "DIGEST_DRY_RUN";
pub const ENV_INTERVAL_SECS: &str = "DIGEST_INTERVAL_SECS";
pub const ENV_EMAIL_PASSWORD: &str = "EMAIL_PASSWORD";

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}
fn default_subject_prefix() -> String {
    "Website Monitor Digest".to_string()
}
fn default_true() -> bool {
    true
}
fn default_auth_attempts() -> u32 {
    3
}
fn default_auth_retry_delay_secs() -> u64 {
    5
}
fn default_state_path() -> PathBuf {
    PathBuf::from("state/sent_ids.json")
}
fn default_whole_word() -> Vec<String> {
    vec!["SAP".to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Feed URLs, processed in this order.
    pub feeds: Vec<String>,
    pub keywords: KeywordConfig,
    pub email: EmailConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordConfig {
    pub list: Vec<String>,
    /// Keywords that only match as whole words (case-insensitive).
    #[serde(default = "default_whole_word")]
    pub whole_word: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub from: String,
    pub to: Vec<String>,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    pub smtp_port: Option<u16>,
    /// Login name; defaults to the sender address.
    pub smtp_user: Option<String>,
    #[serde(default)]
    pub tls: TlsMode,
    #[serde(default)]
    pub format: DigestFormat,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
    #[serde(default = "default_true")]
    pub include_date: bool,
    #[serde(default = "default_auth_attempts")]
    pub auth_attempts: u32,
    #[serde(default = "default_auth_retry_delay_secs")]
    pub auth_retry_delay_secs: u64,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(skip)]
    pub password: Option<String>,
}

impl EmailConfig {
    pub fn username(&self) -> String {
        self.smtp_user.clone().unwrap_or_else(|| self.from.clone())
    }

    pub fn port(&self) -> u16 {
        self.smtp_port.unwrap_or_else(|| self.tls.default_port())
    }

    pub fn auth_retry_delay(&self) -> Duration {
        Duration::from_secs(self.auth_retry_delay_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub id_strategy: IdStrategy,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
            id_strategy: IdStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleConfig {
    /// When set, run repeatedly with this many seconds between runs.
    pub interval_secs: Option<u64>,
}

impl ScheduleConfig {
    pub fn interval(&self) -> Option<Duration> {
        self.interval_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }
}

impl AppConfig {
    /// Parse TOML without touching the environment.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing digest config")?;
        cfg.normalize();
        Ok(cfg)
    }

    /// Load from an explicit path, then apply environment overrides and validate.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg = Self::from_toml_str(&data)?;
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    /// `$DIGEST_CONFIG_PATH`, else `config/digest.toml`.
    pub fn load_default() -> Result<Self> {
        let path = env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from_file(path)
    }

    fn normalize(&mut self) {
        self.feeds = clean_list(std::mem::take(&mut self.feeds));
        self.keywords.list = clean_list(std::mem::take(&mut self.keywords.list));
        self.keywords.whole_word = clean_list(std::mem::take(&mut self.keywords.whole_word));
        self.email.to = clean_list(std::mem::take(&mut self.email.to));
    }

    /// Secrets and overrides from the process environment.
    pub fn apply_env(&mut self) {
        if let Ok(p) = env::var(ENV_STATE_PATH) {
            if !p.trim().is_empty() {
                self.state.path = PathBuf::from(p.trim());
            }
        }
        if let Ok(v) = env::var(ENV_DRY_RUN) {
            self.email.dry_run = matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Ok(v) = env::var(ENV_INTERVAL_SECS) {
            match v.trim().parse::<u64>() {
                Ok(secs) => self.schedule.interval_secs = Some(secs),
                Err(_) => tracing::warn!(value = %v, "ignoring invalid {ENV_INTERVAL_SECS}"),
            }
        }
        self.email.password = env::var(ENV_EMAIL_PASSWORD)
            .ok()
            .filter(|p| !p.is_empty());
        self.summarizer.resolve_api_key();
    }

    pub fn validate(&self) -> Result<()> {
        if self.feeds.is_empty() {
            bail!("at least one feed URL is required");
        }
        for feed in &self.feeds {
            url::Url::parse(feed).with_context(|| format!("invalid feed URL {feed:?}"))?;
        }
        if self.keywords.list.is_empty() {
            bail!("at least one keyword is required");
        }
        parse_mailbox(&self.email.from).context("email.from")?;
        if self.email.to.is_empty() {
            bail!("email.to needs at least one recipient");
        }
        for to in &self.email.to {
            parse_mailbox(to).context("email.to")?;
        }
        if self.email.auth_attempts == 0 {
            bail!("email.auth_attempts must be at least 1");
        }
        if !self.email.dry_run && self.email.password.is_none() {
            bail!("{ENV_EMAIL_PASSWORD} is not set (set {ENV_DRY_RUN}=1 to run without sending)");
        }
        Ok(())
    }
}

pub fn parse_mailbox(s: &str) -> Result<Mailbox> {
    s.parse::<Mailbox>()
        .map_err(|e| anyhow!("invalid mailbox {s:?}: {e}"))
}

/// Trim entries and drop blanks, keeping order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
feeds = [
    "https://www.theregister.com/headlines.atom",
    "  ",
    "https://cio.com/feed",
]

[keywords]
list = ["SAP", "HMRC", " BTP "]

[email]
from = "digest@example.com"
to = ["me@example.com"]

[summarizer]
kind = "huggingface"
max_retries = 2

[state]
path = "tmp/ids.json"
id_strategy = "link-hash"
"#;

    #[test]
    fn parses_with_defaults() {
        let cfg = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.feeds.len(), 2);
        assert_eq!(cfg.keywords.list, vec!["SAP", "HMRC", "BTP"]);
        assert_eq!(cfg.keywords.whole_word, vec!["SAP"]);
        assert_eq!(cfg.email.smtp_host, "smtp.gmail.com");
        assert_eq!(cfg.email.port(), 465);
        assert_eq!(cfg.email.auth_attempts, 3);
        assert_eq!(cfg.email.auth_retry_delay(), Duration::from_secs(5));
        assert_eq!(cfg.email.username(), "digest@example.com");
        assert_eq!(cfg.email.format, DigestFormat::Text);
        assert_eq!(cfg.summarizer.kind, SummarizerKind::Huggingface);
        assert_eq!(cfg.summarizer.max_retries, 2);
        assert_eq!(cfg.summarizer.max_sentences, 2);
        assert_eq!(cfg.state.id_strategy, IdStrategy::LinkHash);
        assert!(cfg.schedule.interval().is_none());
    }

    #[test]
    fn validate_rejects_bad_addresses_and_empty_lists() {
        let mut cfg = AppConfig::from_toml_str(SAMPLE).unwrap();
        cfg.email.dry_run = true;
        assert!(cfg.validate().is_ok());

        let mut bad = cfg.clone();
        bad.email.from = "not an address".into();
        assert!(bad.validate().is_err());

        let mut bad = cfg.clone();
        bad.keywords.list.clear();
        assert!(bad.validate().is_err());

        let mut bad = cfg.clone();
        bad.feeds = vec!["::nope".into()];
        assert!(bad.validate().is_err());
    }

    #[test]
    fn password_required_unless_dry_run() {
        let mut cfg = AppConfig::from_toml_str(SAMPLE).unwrap();
        cfg.email.password = None;
        cfg.email.dry_run = false;
        assert!(cfg.validate().is_err());
        cfg.email.password = Some("secret".into());
        assert!(cfg.validate().is_ok());
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_and_secrets_apply() {
        let mut cfg = AppConfig::from_toml_str(SAMPLE).unwrap();
        env::set_var(ENV_STATE_PATH, "/tmp/other.json");
        env::set_var(ENV_DRY_RUN, "1");
        env::set_var(ENV_INTERVAL_SECS, "259200");
        env::set_var(ENV_EMAIL_PASSWORD, "pw");
        env::set_var(summarizer::ENV_HUGGINGFACE_API_KEY, "hf_token");

        cfg.apply_env();

        env::remove_var(ENV_STATE_PATH);
        env::remove_var(ENV_DRY_RUN);
        env::remove_var(ENV_INTERVAL_SECS);
        env::remove_var(ENV_EMAIL_PASSWORD);
        env::remove_var(summarizer::ENV_HUGGINGFACE_API_KEY);

        assert_eq!(cfg.state.path, PathBuf::from("/tmp/other.json"));
        assert!(cfg.email.dry_run);
        assert_eq!(cfg.schedule.interval(), Some(Duration::from_secs(259_200)));
        assert_eq!(cfg.email.password.as_deref(), Some("pw"));
        assert_eq!(cfg.summarizer.api_key.as_deref(), Some("hf_token"));
    }

    #[serial_test::serial]
    #[test]
    fn load_default_reads_env_path() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("digest.toml");
        fs::write(&p, SAMPLE).unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        env::set_var(ENV_DRY_RUN, "true");

        let cfg = AppConfig::load_default();

        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_DRY_RUN);

        let cfg = cfg.unwrap();
        assert_eq!(cfg.feeds[0], "https://www.theregister.com/headlines.atom");
        assert!(cfg.email.dry_run);
    }
}
