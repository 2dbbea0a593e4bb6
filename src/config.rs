//! Client configuration
//!
//! Resolved from the environment:
//! - `STOREFRONT_API_URL` - base URL of the storefront API (http or https)
//! - `STOREFRONT_TOKEN` - optional bearer token
//! - `STOREFRONT_TIMEOUT_SECS` - request timeout, default 120

use crate::error::{Error, Result};
use std::env;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Environment variable holding the API base URL
pub const API_URL_ENV: &str = "STOREFRONT_API_URL";

/// Environment variable holding the bearer token
pub const TOKEN_ENV: &str = "STOREFRONT_TOKEN";

/// Environment variable holding the request timeout in seconds
pub const TIMEOUT_ENV: &str = "STOREFRONT_TIMEOUT_SECS";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Connection settings for the storefront API
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API base URL
    pub api_url: Url,
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// Whole-request timeout
    pub timeout: Duration,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Config for a base URL with no token and the default timeout
    pub fn new(api_url: &str) -> Result<Self> {
        Ok(Self {
            api_url: parse_api_url(api_url)?,
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Attach a bearer token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Override the request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve from the process environment
    ///
    /// `api_url_override` (the `--api-url` flag) wins over the environment.
    pub fn from_env(api_url_override: Option<&str>) -> Result<Self> {
        Self::from_lookup(api_url_override, |key| env::var(key).ok())
    }

    /// Resolve using an arbitrary variable lookup
    pub fn from_lookup<F>(api_url_override: Option<&str>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = match api_url_override {
            Some(url) => url.to_string(),
            None => lookup(API_URL_ENV).ok_or_else(|| {
                Error::Config(format!("{API_URL_ENV} is not set and --api-url was not given"))
            })?,
        };

        let mut config = Self::new(&api_url)?;

        if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            config = config.with_token(token.trim());
        }

        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{TIMEOUT_ENV} must be whole seconds, got {raw:?}")))?;
            if secs == 0 {
                return Err(Error::Config(format!("{TIMEOUT_ENV} must be positive")));
            }
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

fn parse_api_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("invalid API URL {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::Config(format!(
            "API URL must use http or https, got {other}"
        ))),
    }
}
