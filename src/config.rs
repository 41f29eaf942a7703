//! Configuration loading and management.
//!
//! Loads configuration from the embedded config.toml (or a user supplied file)
//! with environment variable overrides. Command line flags are applied on top by
//! the binary before `validate` runs.

use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::secret::SecretString;

/// Embedded configuration file content.
const CONFIG_TOML: &str = include_str!("../config.toml");

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub privx: PrivxConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection settings for the PrivX instance.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PrivxConfig {
    /// Hostname (URL) of the PrivX instance.
    pub base_url: String,
    /// API client ID (a UUID).
    pub api_client_id: String,
    /// API client secret.
    pub api_client_secret: SecretString,
    /// OAuth client ID (e.g. "privx-external").
    pub oauth_client_id: String,
    /// OAuth client secret.
    pub oauth_client_secret: SecretString,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            connect_timeout_seconds: 10,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub page_size: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path` (or the embedded config.toml) with environment
    /// variable overrides. Does not validate; call [`Config::validate`] once all
    /// overrides are in place.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_toml(&content)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => Self::from_toml(CONFIG_TOML).context("Failed to parse embedded config.toml")?,
        };

        config.apply_env_overrides(|key| env::var(key).ok());

        Ok(config)
    }

    /// Parse a TOML document into a configuration.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `PRIVX_*` (and `RUST_LOG`) overrides using the given lookup.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = lookup("PRIVX_BASE_URL") {
            self.privx.base_url = base_url;
        }

        if let Some(client_id) = lookup("PRIVX_API_CLIENT_ID") {
            self.privx.api_client_id = client_id;
        }

        if let Some(secret) = lookup("PRIVX_API_CLIENT_SECRET") {
            self.privx.api_client_secret = secret.into();
        }

        if let Some(client_id) = lookup("PRIVX_OAUTH_CLIENT_ID") {
            self.privx.oauth_client_id = client_id;
        }

        if let Some(secret) = lookup("PRIVX_OAUTH_CLIENT_SECRET") {
            self.privx.oauth_client_secret = secret.into();
        }

        if let Some(log_level) = lookup("RUST_LOG") {
            self.logging.level = log_level;
        }
    }

    /// Validate that required configuration is present.
    ///
    /// Runs before any network call; every credential is required and has no default.
    pub fn validate(&self) -> Result<()> {
        let privx = &self.privx;

        if privx.base_url.is_empty() {
            anyhow::bail!("base-url is required");
        }
        if privx.api_client_id.is_empty() {
            anyhow::bail!("api-client-id is required");
        }
        if privx.api_client_secret.is_empty() {
            anyhow::bail!("api-client-secret is required");
        }
        if privx.oauth_client_id.is_empty() {
            anyhow::bail!("oauth-client-id is required");
        }
        if privx.oauth_client_secret.is_empty() {
            anyhow::bail!("oauth-client-secret is required");
        }

        let url = Url::parse(self.base_url())
            .with_context(|| format!("base-url {:?} is not a valid URL", privx.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("base-url must use http or https, got {:?}", url.scheme());
        }

        Ok(())
    }

    /// Base URL with any trailing slashes removed.
    pub fn base_url(&self) -> &str {
        self.privx.base_url.trim_end_matches('/')
    }

    /// Get the OAuth token URL for this PrivX instance.
    pub fn token_url(&self) -> String {
        format!("{}/auth/api/v1/oauth/token", self.base_url())
    }

    /// Get the role-store API root for this PrivX instance.
    pub fn role_store_url(&self) -> String {
        format!("{}/role-store/api/v1", self.base_url())
    }
}
