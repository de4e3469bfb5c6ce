//! TOML configuration with environment overrides.
//!
//! The config file is optional; every field has a default. After the file is
//! parsed, the deployment environment variables are applied on top:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `PORT` | `server.port` |
//! | `MONGODB_URI` | `store.uri` |
//! | `DOCDROP_HOSTING` | `server.hosting` (`listen` or `embedded`) |
//! | `ASK_API_URL` | `ask.endpoint` |

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub ask: AskConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub hosting: HostingMode,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            hosting: HostingMode::default(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// How the HTTP surface is hosted.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HostingMode {
    /// Bind `server.host:server.port` and serve.
    #[default]
    Listen,
    /// Bind nothing; a host runtime drives requests through
    /// [`EmbeddedHandler`](crate::hosting::EmbeddedHandler).
    Embedded,
}

impl FromStr for HostingMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "listen" | "local" => Ok(Self::Listen),
            "embedded" | "serverless" => Ok(Self::Embedded),
            other => bail!("Unknown hosting mode: '{}'. Must be listen or embedded.", other),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Connection string; the scheme selects the backend.
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub lifecycle: Lifecycle,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: None,
            database: default_database(),
            collection: default_collection(),
            lifecycle: Lifecycle::default(),
            connect_timeout_secs: default_connect_timeout_secs(),
            retry_interval_secs: default_retry_interval_secs(),
        }
    }
}

fn default_database() -> String {
    "docdrop".to_string()
}
fn default_collection() -> String {
    "uploads".to_string()
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_retry_interval_secs() -> u64 {
    5
}

/// When document-store connections are opened and closed.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// One connection opened at startup and reused by every request.
    #[default]
    Shared,
    /// A connection opened and closed inside each request.
    PerRequest,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UploadConfig {
    #[serde(default)]
    pub missing_file: MissingFilePolicy,
}

/// What an upload request without a `file` field does.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingFilePolicy {
    /// Respond 400 and insert nothing.
    #[default]
    Reject,
    /// Insert a record with `filename = null` and `size = 0`.
    RecordEmpty,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AskConfig {
    /// Base URL of the question-answering service. Unset means placeholder mode.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_placeholder_delay_ms")]
    pub placeholder_delay_ms: u64,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            placeholder_delay_ms: default_placeholder_delay_ms(),
            timeout_secs: None,
        }
    }
}

fn default_placeholder_delay_ms() -> u64 {
    600
}

impl Config {
    /// Applies environment overrides using `lookup` to read variables.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port number: '{}'", port))?;
        }
        if let Some(uri) = get("MONGODB_URI") {
            self.store.uri = Some(uri);
        }
        if let Some(hosting) = get("DOCDROP_HOSTING") {
            self.server.hosting = hosting.parse()?;
        }
        if let Some(endpoint) = get("ASK_API_URL") {
            self.ask.endpoint = Some(endpoint);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Loads the config file (if present), applies process environment
/// overrides, and validates the result.
pub fn load_config(path: &Path) -> Result<Config> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Like [`load_config`] with an explicit environment lookup.
pub fn load_config_with_env<F>(path: &Path, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str::<Config>(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    config.apply_env_overrides(lookup)?;
    // A blank endpoint in the file means placeholder mode, same as a blank env var.
    if config.ask.endpoint.as_deref().is_some_and(|e| e.trim().is_empty()) {
        config.ask.endpoint = None;
    }
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        bail!("server.port must be > 0");
    }
    if config.server.max_upload_bytes == 0 {
        bail!("server.max_upload_bytes must be > 0");
    }

    if config.store.database.trim().is_empty() {
        bail!("store.database must not be empty");
    }
    if config.store.collection.trim().is_empty() {
        bail!("store.collection must not be empty");
    }
    if config.store.retry_interval_secs == 0 {
        bail!("store.retry_interval_secs must be > 0");
    }

    if let Some(endpoint) = &config.ask.endpoint {
        let url = reqwest::Url::parse(endpoint)
            .with_context(|| format!("ask.endpoint is not a valid URL: '{}'", endpoint))?;
        match url.scheme() {
            "http" | "https" => {}
            other => bail!("ask.endpoint must use http or https, got '{}'", other),
        }
    }

    Ok(())
}
