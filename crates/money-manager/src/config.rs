//! Configuration for the money manager client

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::constants;

// =============================================================================
// File-based Configuration (config.toml)
// =============================================================================

/// Configuration loaded from config.toml. Every section is optional.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub display: DisplaySection,
    #[serde(default)]
    pub session: SessionSection,
}

/// Records service settings
#[derive(Debug, Default, Deserialize)]
pub struct ApiSection {
    /// Base URL of the records service
    pub base_url: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Attempts for idempotent requests, including the first
    pub max_retries: Option<u32>,
    /// First retry delay in milliseconds
    pub backoff_base_ms: Option<u64>,
}

/// Output formatting
#[derive(Debug, Default, Deserialize)]
pub struct DisplaySection {
    pub currency_symbol: Option<String>,
    /// Default dashboard period (weekly, monthly, yearly)
    pub period: Option<String>,
}

/// Bearer token supplied directly instead of via `login`
#[derive(Debug, Default, Deserialize)]
pub struct SessionSection {
    pub token: Option<String>,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content).with_context(|| {
            format!(
                "Failed to parse {}. Check for:\n\
                 - Invalid TOML syntax (missing quotes, brackets, etc.)\n\
                 - Incorrect data types (strings vs numbers)",
                path.display()
            )
        })
    }

    /// Load the file if present; a missing file means all defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }
}

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Settings resolved from the file and command-line overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL without trailing slash
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub currency_symbol: String,
    pub default_period: String,
    /// Token from config.toml, used when no session file exists
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: constants::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(constants::DEFAULT_TIMEOUT_SECS),
            max_retries: constants::DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(constants::DEFAULT_BACKOFF_BASE_MS),
            currency_symbol: constants::DEFAULT_CURRENCY_SYMBOL.to_string(),
            default_period: "monthly".to_string(),
            token: None,
        }
    }
}

impl Config {
    /// Create config from file config and optional base URL override
    pub fn from_file(file_config: &FileConfig, base_url: Option<String>) -> Result<Self> {
        let defaults = Config::default();
        let api = &file_config.api;

        let base_url = base_url
            .or_else(|| api.base_url.clone())
            .unwrap_or(defaults.base_url)
            .trim_end_matches('/')
            .to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            anyhow::bail!("Invalid base_url '{}': must start with http:// or https://", base_url);
        }

        let max_retries = api.max_retries.unwrap_or(defaults.max_retries);
        if max_retries == 0 {
            anyhow::bail!("api.max_retries must be at least 1");
        }

        Ok(Self {
            base_url,
            timeout: api.timeout_secs.map(Duration::from_secs).unwrap_or(defaults.timeout),
            max_retries,
            backoff_base: api
                .backoff_base_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff_base),
            currency_symbol: file_config
                .display
                .currency_symbol
                .clone()
                .unwrap_or(defaults.currency_symbol),
            default_period: file_config
                .display
                .period
                .clone()
                .unwrap_or(defaults.default_period),
            token: file_config
                .session
                .token
                .clone()
                .filter(|t| !t.trim().is_empty()),
        })
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> FileConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_file(&parse(""), None).unwrap();
        assert_eq!(config.base_url, constants::DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(constants::DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.max_retries, constants::DEFAULT_MAX_RETRIES);
        assert_eq!(config.currency_symbol, "₹");
        assert!(config.token.is_none());
    }

    #[test]
    fn test_file_values_and_override() {
        let file = parse(
            r#"
            [api]
            base_url = "http://localhost:5000/"
            timeout_secs = 3
            max_retries = 5

            [display]
            currency_symbol = "$"
            period = "weekly"

            [session]
            token = "abc"
            "#,
        );

        let config = Config::from_file(&file, None).unwrap();
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.url("/api/income"), "http://localhost:5000/api/income");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.currency_symbol, "$");
        assert_eq!(config.default_period, "weekly");
        assert_eq!(config.token.as_deref(), Some("abc"));

        let overridden = Config::from_file(&file, Some("https://example.com".to_string())).unwrap();
        assert_eq!(overridden.base_url, "https://example.com");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_file(&parse("[api]\nbase_url = \"ftp://x\""), None).is_err());
        assert!(Config::from_file(&parse("[api]\nmax_retries = 0"), None).is_err());
        assert!(toml::from_str::<FileConfig>("[api]\ntimeout_secs = \"soon\"").is_err());
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = std::env::temp_dir().join("money-manager-definitely-missing.toml");
        let file = FileConfig::load_or_default(&path).unwrap();
        assert!(file.api.base_url.is_none());
    }
}
