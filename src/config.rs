//! Provider configuration.
//!
//! Connection settings come from two places: the provider's configuration
//! block and the process environment. An explicit, non-empty attribute in
//! the configuration block wins; the environment variable is the fallback.
//! Empty strings count as unset on both sides.
//!
//! | Setting      | Attribute    | Environment variable   | Default                     |
//! |--------------|--------------|------------------------|-----------------------------|
//! | API key      | `api_key`    | `CHECKLY_API_KEY`      | none (requests are anonymous) |
//! | API URL      | `api_url`    | `CHECKLY_API_URL`      | `https://api.checklyhq.com` |
//! | Account ID   | `account_id` | `CHECKLY_ACCOUNT_ID`   | none (required)             |
//! | Source tag   | -            | `CHECKLY_API_SOURCE`   | `TF`                        |

use std::fmt;

use serde::Deserialize;

use crate::error::ProviderError;

/// Default Checkly API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.checklyhq.com";

/// Source tag sent with every request when `CHECKLY_API_SOURCE` is unset.
pub const DEFAULT_API_SOURCE: &str = "TF";

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "CHECKLY_API_KEY";

/// Environment variable holding the API URL.
pub const ENV_API_URL: &str = "CHECKLY_API_URL";

/// Environment variable holding the account ID.
pub const ENV_ACCOUNT_ID: &str = "CHECKLY_ACCOUNT_ID";

/// Environment variable overriding the request source tag.
pub const ENV_API_SOURCE: &str = "CHECKLY_API_SOURCE";

/// The provider configuration block as written by the operator.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderConfig {
    /// The Checkly account ID to be used.
    #[serde(default)]
    pub account_id: Option<String>,
    /// The Checkly backend to be used.
    #[serde(default)]
    pub api_url: Option<String>,
    /// The Checkly API key to be used.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ProviderConfig {
    /// Decode the configuration block sent by the host.
    ///
    /// A null block is treated as empty.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("account_id", &self.account_id)
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Fully resolved settings used to build the API client.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Bearer token for the API, if any.
    pub api_key: Option<String>,
    /// Base URL of the API.
    pub api_url: String,
    /// Account the requests act on.
    pub account_id: String,
    /// Source tag identifying this client to the API.
    pub source: String,
}

impl ConnectionSettings {
    /// Resolve settings from the configuration block and the process environment.
    pub fn from_env(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve settings using `env` to look up environment variables.
    ///
    /// Fails when no account ID is available from either source, or when the
    /// resulting API URL is not an absolute http(s) URL.
    pub fn resolve<F>(config: &ProviderConfig, env: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = pick(config.api_key.as_deref(), env(ENV_API_KEY));
        let api_url = pick(config.api_url.as_deref(), env(ENV_API_URL))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let account_id = pick(config.account_id.as_deref(), env(ENV_ACCOUNT_ID)).ok_or_else(|| {
            ProviderError::setting(
                "account_id",
                "Missing Checkly account ID",
                format!(
                    "Set the `account_id` provider attribute or the {} environment variable.",
                    ENV_ACCOUNT_ID
                ),
            )
        })?;
        let source = pick(None, env(ENV_API_SOURCE)).unwrap_or_else(|| DEFAULT_API_SOURCE.to_string());

        match reqwest::Url::parse(&api_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {},
            Ok(url) => {
                return Err(ProviderError::setting(
                    "api_url",
                    "Invalid Checkly API URL",
                    format!("{:?} uses unsupported scheme {:?}", api_url, url.scheme()),
                ))
            },
            Err(e) => {
                return Err(ProviderError::setting(
                    "api_url",
                    "Invalid Checkly API URL",
                    format!("{:?} is not an absolute URL: {}", api_url, e),
                ))
            },
        }

        Ok(Self {
            api_key,
            api_url,
            account_id,
            source,
        })
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("account_id", &self.account_id)
            .field("source", &self.source)
            .finish()
    }
}

fn pick(explicit: Option<&str>, fallback: Option<String>) -> Option<String> {
    explicit
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| fallback.filter(|v| !v.is_empty()))
}
