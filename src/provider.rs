//! The Checkly provider.
//!
//! [`ChecklyProvider`] owns the API client built during `Configure` and
//! dispatches resource operations to the matching handler.

use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::client::{ChecklyApi, ChecklyClient};
use crate::config::{ConnectionSettings, ProviderConfig, ENV_API_KEY};
use crate::error::ProviderError;
use crate::resources::environment_variable::{self, EnvironmentVariableResource};
use crate::schema::{Attribute, Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities};
use crate::validation::validate;

/// Provider for Checkly account resources.
pub struct ChecklyProvider {
    version: String,
    client: RwLock<Option<Arc<dyn ChecklyApi>>>,
}

impl ChecklyProvider {
    /// Create an unconfigured provider reporting `version`.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            client: RwLock::new(None),
        }
    }

    /// Create a provider that is already bound to `client`.
    pub fn with_client(version: impl Into<String>, client: Arc<dyn ChecklyApi>) -> Self {
        Self {
            version: version.into(),
            client: RwLock::new(Some(client)),
        }
    }

    /// The release version reported in metadata.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Whether a client has been configured.
    pub fn is_configured(&self) -> bool {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn provider_schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "api_key",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("The Checkly API key to be used."),
            )
            .with_attribute(
                "api_url",
                Attribute::optional_string().with_description("The Checkly backend to be used."),
            )
            .with_attribute(
                "account_id",
                Attribute::optional_string().with_description("The Checkly account ID to be used."),
            )
    }

    fn environment_variables(&self) -> Result<EnvironmentVariableResource, ProviderError> {
        let client = self
            .client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                ProviderError::NotConfigured(
                    "Configure must complete before resources can be managed".to_string(),
                )
            })?;
        Ok(EnvironmentVariableResource::new(client))
    }
}

fn check_resource_type(resource_type: &str) -> Result<(), ProviderError> {
    if resource_type == environment_variable::TYPE_NAME {
        Ok(())
    } else {
        Err(ProviderError::UnknownResource(resource_type.to_string()))
    }
}

#[async_trait::async_trait]
impl ProviderService for ChecklyProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(Self::provider_schema())
            .with_resource(environment_variable::TYPE_NAME, environment_variable::schema())
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            resources: vec![environment_variable::TYPE_NAME.to_string()],
            capabilities: ServerCapabilities { plan_destroy: true },
            version: self.version.clone(),
        }
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&Self::provider_schema(), &config))
    }

    #[instrument(skip(self, config))]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        // A failed reconfiguration must not leave the previous client usable
        self.client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let diagnostics = validate(&Self::provider_schema(), &config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Ok(diagnostics);
        }

        let config = ProviderConfig::from_value(config)?;
        let settings = ConnectionSettings::from_env(&config)?;
        debug!(settings = ?settings, "resolved connection settings");

        let client = ChecklyClient::from_settings(&settings)
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        let mut diagnostics = Vec::new();
        if settings.api_key.is_none() {
            warn!("no API key configured, requests will be unauthenticated");
            diagnostics.push(
                Diagnostic::warning("Missing Checkly API key")
                    .with_detail(format!(
                        "Set the `api_key` provider attribute or the {} environment variable.",
                        ENV_API_KEY
                    ))
                    .with_attribute("api_key"),
            );
        }

        *self.client.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(client));
        info!(
            account_id = %settings.account_id,
            api_url = %settings.api_url,
            "configured Checkly client"
        );
        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        info!("stopping Checkly provider");
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        check_resource_type(resource_type)?;
        Ok(validate(&environment_variable::schema(), &config))
    }

    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        let current = environment_variable::schema().version;
        if version < 0 || version as u64 > current {
            return Err(ProviderError::InvalidState(format!(
                "cannot upgrade {} state from schema version {} (current is {})",
                resource_type, version, current
            )));
        }
        Ok(state)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        check_resource_type(resource_type)?;
        environment_variable::plan(prior_state, proposed_state)
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        self.environment_variables()?.create(planned_state).await
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        self.environment_variables()?.read(current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        self.environment_variables()?
            .update(prior_state, planned_state)
            .await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        check_resource_type(resource_type)?;
        self.environment_variables()?.delete(current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        check_resource_type(resource_type)?;
        Ok(vec![environment_variable::import(id)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::EnvironmentVariable;
    use crate::resources::environment_variable::TYPE_NAME;
    use crate::testing::InMemoryChecklyApi;
    use serde_json::json;

    #[test]
    fn test_metadata() {
        let provider = ChecklyProvider::new("1.2.3");
        let metadata = provider.metadata();
        assert_eq!(metadata.resources, vec![TYPE_NAME.to_string()]);
        assert!(metadata.capabilities.plan_destroy);
        assert_eq!(metadata.version, "1.2.3");
    }

    #[test]
    fn test_provider_schema() {
        let schema = ChecklyProvider::new("dev").schema();
        let api_key = schema.provider.attribute("api_key").unwrap();
        assert!(api_key.presence.is_optional() && api_key.sensitive);
        assert!(schema.provider.attribute("api_url").unwrap().presence.is_optional());
        assert!(schema.provider.attribute("account_id").unwrap().presence.is_optional());
    }

    #[tokio::test]
    async fn test_resource_ops_require_configure() {
        let provider = ChecklyProvider::new("dev");
        assert!(!provider.is_configured());

        let err = provider
            .read(TYPE_NAME, json!({"key": "one", "id": "one"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));

        // Planning and import never touch the API
        assert!(provider
            .plan(TYPE_NAME, None, json!({"key": "one", "value": "v"}), Value::Null)
            .await
            .is_ok());
        assert!(provider.import_resource(TYPE_NAME, "one").await.is_ok());
    }

    #[tokio::test]
    async fn test_configure_with_explicit_settings() {
        let provider = ChecklyProvider::new("dev");
        let diagnostics = provider
            .configure(json!({
                "account_id": "acc-123",
                "api_url": "http://127.0.0.1:9",
                "api_key": "cu_key"
            }))
            .await
            .unwrap();

        assert!(diagnostics.is_empty());
        assert!(provider.is_configured());
    }

    #[tokio::test]
    async fn test_failed_reconfigure_drops_previous_client() {
        let provider = ChecklyProvider::with_client("dev", Arc::new(InMemoryChecklyApi::new()));
        assert!(provider.is_configured());

        let err = provider
            .configure(json!({"account_id": "acc", "api_url": "ftp://api.checklyhq.com"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Setting { attribute: "api_url", .. }));
        assert!(!provider.is_configured());

        let err = provider
            .read(TYPE_NAME, json!({"key": "one", "id": "one"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_configure_rejects_bad_types() {
        let provider = ChecklyProvider::new("dev");
        let diagnostics = provider
            .configure(json!({"account_id": 42}))
            .await
            .unwrap();

        assert!(diagnostics.iter().any(Diagnostic::is_error));
        assert!(!provider.is_configured());
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let provider = ChecklyProvider::with_client("dev", Arc::new(InMemoryChecklyApi::new()));
        let err = provider
            .create("checkly_check", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));

        assert!(provider
            .validate_resource_config("checkly_check", json!({}))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_validate_resource_config() {
        let provider = ChecklyProvider::new("dev");

        let diagnostics = provider
            .validate_resource_config(TYPE_NAME, json!({"key": "one", "value": "v"}))
            .await
            .unwrap();
        assert!(diagnostics.is_empty());

        let diagnostics = provider
            .validate_resource_config(TYPE_NAME, json!({"key": "one", "locked": "yes"}))
            .await
            .unwrap();
        let attrs: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_deref())
            .collect();
        assert!(attrs.contains(&"value"));
        assert!(attrs.contains(&"locked"));
    }

    #[tokio::test]
    async fn test_upgrade_resource_state() {
        let provider = ChecklyProvider::new("dev");
        let state = json!({"key": "one", "value": "v", "locked": false, "id": "one"});

        let upgraded = provider
            .upgrade_resource_state(TYPE_NAME, 0, state.clone())
            .await
            .unwrap();
        assert_eq!(upgraded, state);

        assert!(provider
            .upgrade_resource_state(TYPE_NAME, 1, state)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_dispatch_to_environment_variables() {
        let api = Arc::new(InMemoryChecklyApi::new());
        let provider = ChecklyProvider::with_client("dev", api.clone());

        let state = provider
            .create(TYPE_NAME, json!({"key": "one", "value": "v", "locked": false, "id": null}))
            .await
            .unwrap();
        assert_eq!(state["id"], "one");
        assert_eq!(
            api.get("one"),
            Some(EnvironmentVariable {
                key: "one".to_string(),
                value: "v".to_string(),
                locked: false,
            })
        );

        provider.delete(TYPE_NAME, state).await.unwrap();
        assert!(api.is_empty());
    }
}
