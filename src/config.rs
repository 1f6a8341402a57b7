//! Configuration file parser for `feeds.toml`.
//!
//! The configuration is loaded once at startup into an immutable [`Config`]
//! that is passed explicitly (as `Arc<Config>`) to the synchronizer, the
//! scheduler and the API layer. Unlike a UI preferences file, this one is
//! required: the service cannot run without a database path, feeds and users.
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::util::validate_feed_url;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// Config parsed but describes an unusable setup.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// A folder declared in the configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FolderConfig {
    pub name: String,
}

/// A feed declared in the configuration.
///
/// `username`/`password` are only used when both are present.
#[derive(Debug, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    pub folder: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "optional_secret")]
    pub password: Option<SecretString>,
}

impl FeedConfig {
    /// Basic-auth credentials for this feed, if both halves are configured.
    pub fn credentials(&self) -> Option<Credentials<'_>> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            _ => None,
        }
    }
}

/// Borrowed basic-auth credentials for an authenticated feed fetch.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a SecretString,
}

/// An API user allowed to talk to the Nextcloud News endpoints.
#[derive(Debug, Deserialize)]
pub struct UserConfig {
    pub username: String,
    #[serde(deserialize_with = "secret")]
    pub password: SecretString,
}

/// Top-level application configuration.
///
/// Passwords are held as [`SecretString`], so `{:?}` output never shows them.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// SQLite database file.
    pub database: String,

    /// Minutes to sleep between the end of one sync pass and the start of the next.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_minutes: u64,

    /// Address the API server listens on.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Per-fetch timeout in seconds. 0 disables the timeout.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Retries on HTTP 429/5xx and truncated bodies.
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,

    #[serde(default)]
    pub folders: Vec<FolderConfig>,

    #[serde(default)]
    pub feeds: Vec<FeedConfig>,

    #[serde(default)]
    pub users: Vec<UserConfig>,
}

fn default_poll_interval() -> u64 {
    15
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_fetch_retries() -> u32 {
    3
}

fn secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn optional_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|o| o.map(SecretString::from))
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "database",
        "poll_interval_minutes",
        "bind",
        "fetch_timeout_secs",
        "fetch_retries",
        "folders",
        "feeds",
        "users",
    ];

    /// Load and validate configuration from a TOML file.
    ///
    /// - Missing file → `Err(ConfigError::Io)`
    /// - Invalid TOML or wrong types → `Err(ConfigError::Parse)`
    /// - Dangling folder references, duplicate names, bad URLs → `Err(ConfigError::Invalid)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let meta = std::fs::metadata(path)?;
        if meta.len() > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "Config file is {} bytes (max {} bytes)",
                meta.len(),
                Self::MAX_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            folders = config.folders.len(),
            feeds = config.feeds.len(),
            users = config.users.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::Invalid("database path is empty".into()));
        }
        if self.poll_interval_minutes == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_minutes must be at least 1".into(),
            ));
        }

        let mut folder_names = HashSet::new();
        for folder in &self.folders {
            if !folder_names.insert(folder.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate folder '{}'",
                    folder.name
                )));
            }
        }

        let mut feed_names = HashSet::new();
        for feed in &self.feeds {
            if !feed_names.insert(feed.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate feed '{}'",
                    feed.name
                )));
            }
            if !folder_names.contains(feed.folder.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "feed '{}' references undeclared folder '{}'",
                    feed.name, feed.folder
                )));
            }
            validate_feed_url(&feed.url).map_err(|e| {
                ConfigError::Invalid(format!("feed '{}' has a bad url: {}", feed.name, e))
            })?;
        }

        Ok(())
    }

    /// The pause between sync passes.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_minutes.saturating_mul(60))
    }

    /// The per-fetch timeout, `None` when disabled.
    pub fn fetch_timeout(&self) -> Option<Duration> {
        (self.fetch_timeout_secs > 0).then(|| Duration::from_secs(self.fetch_timeout_secs))
    }

    /// Look up a configured feed by its unique name.
    pub fn feed(&self, name: &str) -> Option<&FeedConfig> {
        self.feeds.iter().find(|f| f.name == name)
    }

    /// Basic-auth credentials configured for the named feed.
    pub fn feed_credentials(&self, name: &str) -> Option<Credentials<'_>> {
        self.feed(name).and_then(FeedConfig::credentials)
    }

    /// Check an API username/password pair against the configured users.
    pub fn authorized_user(&self, username: &str, password: &str) -> bool {
        self.users
            .iter()
            .any(|u| u.username == username && u.password.expose_secret() == password)
    }
}

// ============================================================================
// Tests
// ============================================================================
