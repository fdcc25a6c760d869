//! HTTP client for the Checkly environment variable API.
//!
//! The provider talks to exactly four endpoints:
//!
//! - `POST   /v1/variables`
//! - `GET    /v1/variables/{key}`
//! - `PUT    /v1/variables/{key}`
//! - `DELETE /v1/variables/{key}`
//!
//! Every request carries the account header and a source tag. Failures are
//! returned as [`ApiError`] and never retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ConnectionSettings, DEFAULT_API_SOURCE};
use crate::error::ApiError;

/// Header carrying the account the request acts on.
const ACCOUNT_HEADER: &str = "X-Checkly-Account";

/// Header identifying the calling tool.
const SOURCE_HEADER: &str = "x-checkly-source";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// An environment variable as represented by the Checkly API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    /// Variable name; also its remote identifier.
    pub key: String,
    /// Variable value.
    pub value: String,
    /// Whether the value is hidden in the Checkly UI.
    #[serde(default)]
    pub locked: bool,
}

/// The subset of the Checkly API the provider needs.
///
/// Resource handlers receive an implementation explicitly, so tests can
/// substitute an in-memory fake.
#[async_trait]
pub trait ChecklyApi: Send + Sync {
    /// Create a new environment variable.
    async fn create_environment_variable(
        &self,
        variable: &EnvironmentVariable,
    ) -> Result<EnvironmentVariable, ApiError>;

    /// Look up an environment variable by key.
    async fn get_environment_variable(&self, key: &str) -> Result<EnvironmentVariable, ApiError>;

    /// Replace the environment variable currently stored under `key`.
    async fn update_environment_variable(
        &self,
        key: &str,
        variable: &EnvironmentVariable,
    ) -> Result<EnvironmentVariable, ApiError>;

    /// Delete an environment variable by key.
    async fn delete_environment_variable(&self, key: &str) -> Result<(), ApiError>;
}

/// `reqwest`-backed Checkly API client.
#[derive(Debug, Clone)]
pub struct ChecklyClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    account_id: String,
    source: String,
}

impl ChecklyClient {
    /// Create a client for the given API base URL.
    pub fn new(api_url: &str, api_key: Option<String>) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(api_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", api_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(api_url.to_string()));
        }

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key,
            account_id: String::new(),
            source: DEFAULT_API_SOURCE.to_string(),
        })
    }

    /// Create a client from resolved connection settings.
    pub fn from_settings(settings: &ConnectionSettings) -> Result<Self, ApiError> {
        let mut client = Self::new(&settings.api_url, settings.api_key.clone())?;
        client.set_account_id(settings.account_id.clone());
        client.set_source(settings.source.clone());
        Ok(client)
    }

    /// Set the account every request acts on.
    pub fn set_account_id(&mut self, account_id: impl Into<String>) {
        self.account_id = account_id.into();
    }

    /// Set the source tag sent with every request.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
    }

    /// The account requests act on.
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header(ACCOUNT_HEADER, &self.account_id)
            .header(SOURCE_HEADER, &self.source);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let resp = builder.send().await?;
        let status = resp.status();
        debug!(status = status.as_u16(), url = %resp.url(), "Checkly API responded");

        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND {
            Err(ApiError::NotFound(body))
        } else {
            Err(ApiError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl ChecklyApi for ChecklyClient {
    async fn create_environment_variable(
        &self,
        variable: &EnvironmentVariable,
    ) -> Result<EnvironmentVariable, ApiError> {
        let url = self.url(&["v1", "variables"])?;
        let resp = self.send(self.request(Method::POST, url).json(variable)).await?;
        Ok(resp.json().await?)
    }

    async fn get_environment_variable(&self, key: &str) -> Result<EnvironmentVariable, ApiError> {
        let url = self.url(&["v1", "variables", key])?;
        let resp = self.send(self.request(Method::GET, url)).await?;
        Ok(resp.json().await?)
    }

    async fn update_environment_variable(
        &self,
        key: &str,
        variable: &EnvironmentVariable,
    ) -> Result<EnvironmentVariable, ApiError> {
        let url = self.url(&["v1", "variables", key])?;
        let resp = self.send(self.request(Method::PUT, url).json(variable)).await?;
        Ok(resp.json().await?)
    }

    async fn delete_environment_variable(&self, key: &str) -> Result<(), ApiError> {
        let url = self.url(&["v1", "variables", key])?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let client = ChecklyClient::new("https://api.checklyhq.com", None).unwrap();
        assert_eq!(
            client.url(&["v1", "variables", "API_TOKEN"]).unwrap().as_str(),
            "https://api.checklyhq.com/v1/variables/API_TOKEN"
        );

        let client = ChecklyClient::new("http://localhost:3000/", None).unwrap();
        assert_eq!(
            client.url(&["v1", "variables"]).unwrap().as_str(),
            "http://localhost:3000/v1/variables"
        );
    }

    #[test]
    fn test_url_segments_are_encoded() {
        let client = ChecklyClient::new("https://api.checklyhq.com", None).unwrap();
        let url = client.url(&["v1", "variables", "a/b c"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.checklyhq.com/v1/variables/a%2Fb%20c"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ChecklyClient::new("not a url", None),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(matches!(
            ChecklyClient::new("mailto:ops@example.com", None),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_from_settings() {
        let settings = ConnectionSettings {
            api_key: Some("cu_key".to_string()),
            api_url: "https://api.checklyhq.com".to_string(),
            account_id: "acc-123".to_string(),
            source: "TF".to_string(),
        };
        let client = ChecklyClient::from_settings(&settings).unwrap();
        assert_eq!(client.account_id(), "acc-123");
        assert_eq!(client.source, "TF");
    }

    #[test]
    fn test_environment_variable_serde() {
        let var: EnvironmentVariable =
            serde_json::from_str(r#"{"key":"API_TOKEN","value":"abc"}"#).unwrap();
        assert!(!var.locked);

        let json = serde_json::to_value(&var).unwrap();
        assert_eq!(json["key"], "API_TOKEN");
        assert_eq!(json["locked"], false);
    }
}
