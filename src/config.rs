use log::warn;
use std::env;
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_API_VERSION: &str = "2022-11-28";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid http(s) URL: {value}")]
    InvalidUrl { var: &'static str, value: String },
    #[error("{var} must be a positive number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },
}

/// Runtime configuration for the GitHub issues client.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub api_url: String,
    pub api_version: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Env vars:
    /// - GITHUB_TOKEN (or GH_TOKEN); sent as-is, even when empty
    /// - GITHUB_API_URL (default: https://api.github.com)
    /// - GITHUB_API_VERSION (default: 2022-11-28)
    /// - GITHUB_HTTP_TIMEOUT_SECS (default: 30)
    /// - GITHUB_USER_AGENT (default: github-issues-mcp/<version>)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = match lookup("GITHUB_TOKEN").or_else(|| lookup("GH_TOKEN")) {
            Some(t) => t,
            None => {
                warn!("GITHUB_TOKEN/GH_TOKEN not set; requests will be sent with an empty token");
                String::new()
            }
        };

        let raw_url = lookup("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = validate_base_url("GITHUB_API_URL", &raw_url)?;

        let api_version =
            lookup("GITHUB_API_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        let timeout_secs = match lookup("GITHUB_HTTP_TIMEOUT_SECS") {
            None => DEFAULT_TIMEOUT_SECS,
            Some(s) => match s.trim().parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        var: "GITHUB_HTTP_TIMEOUT_SECS",
                        value: s,
                    })
                }
            },
        };

        let user_agent = lookup("GITHUB_USER_AGENT")
            .unwrap_or_else(|| format!("github-issues-mcp/{}", env!("CARGO_PKG_VERSION")));

        Ok(Self {
            token,
            api_url,
            api_version,
            user_agent,
            timeout_secs,
        })
    }
}

// Paths are appended verbatim, so the stored base never ends in '/'.
fn validate_base_url(var: &'static str, value: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        var,
        value: value.to_string(),
    };
    let parsed = Url::parse(value).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
        return Err(invalid());
    }
    Ok(value.trim_end_matches('/').to_string())
}
