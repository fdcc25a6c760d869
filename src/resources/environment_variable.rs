//! The `checkly_environment_variable` resource.
//!
//! Each lifecycle operation decodes the host's JSON state into
//! [`EnvironmentVariableModel`], performs one call against the Checkly API and
//! writes the mapped result back. The remote key doubles as the resource ID.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::client::{ChecklyApi, EnvironmentVariable};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::types::{AttributeChange, ImportedResource, PlanResult};

/// Resource type name registered with the host.
pub const TYPE_NAME: &str = "checkly_environment_variable";

/// Value of `locked` when the configuration omits it.
pub const DEFAULT_LOCKED: bool = false;

/// Schema for the resource.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("Environment variable shared by all checks of a Checkly account")
        .with_attribute(
            "key",
            Attribute::required_string().with_description("Key of the environment variable"),
        )
        .with_attribute(
            "value",
            Attribute::required_string()
                .sensitive()
                .with_description("Value of the environment variable"),
        )
        .with_attribute(
            "locked",
            Attribute::optional_computed_bool()
                .with_default(json!(DEFAULT_LOCKED))
                .with_description(
                    "Whether the environment variable is locked or not. Set to true for storing sensitive data.",
                ),
        )
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("The Id of the environment variable"),
        )
}

/// State of one environment variable as stored by the host.
///
/// Every field is nullable: an imported instance starts out with only `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariableModel {
    /// Key of the variable.
    #[serde(default)]
    pub key: Option<String>,
    /// Value of the variable.
    #[serde(default)]
    pub value: Option<String>,
    /// Whether the variable is locked.
    #[serde(default)]
    pub locked: Option<bool>,
    /// Mirror of the remote key once the variable exists.
    #[serde(default)]
    pub id: Option<String>,
}

impl EnvironmentVariableModel {
    /// Decode a model from host state.
    pub fn from_state(state: Value) -> Result<Self, ProviderError> {
        if !state.is_object() {
            return Err(ProviderError::InvalidState(format!(
                "expected an object for {}, got {}",
                TYPE_NAME, state
            )));
        }
        Ok(serde_json::from_value(state)?)
    }

    /// Encode the model as host state.
    pub fn into_state(self) -> Result<Value, ProviderError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Map the model onto the API's entity shape.
    pub fn to_remote(&self) -> EnvironmentVariable {
        EnvironmentVariable {
            key: self.key.clone().unwrap_or_default(),
            value: self.value.clone().unwrap_or_default(),
            locked: self.locked.unwrap_or(DEFAULT_LOCKED),
        }
    }

    /// Overwrite the model with the authoritative remote entity.
    pub fn update_from_remote(&mut self, remote: &EnvironmentVariable) {
        self.key = Some(remote.key.clone());
        self.value = Some(remote.value.clone());
        self.locked = Some(remote.locked);
        self.id = Some(remote.key.clone());
    }

    /// The identifier used to address the variable remotely.
    fn remote_id(&self) -> Option<&str> {
        non_empty(self.id.as_deref()).or_else(|| non_empty(self.key.as_deref()))
    }

    fn attribute_values(&self) -> [(&'static str, Value); 4] {
        [
            ("key", json!(self.key)),
            ("value", json!(self.value)),
            ("locked", json!(self.locked)),
            ("id", json!(self.id)),
        ]
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Compute the planned state for a create, update or destroy.
///
/// An omitted `locked` always plans to the schema default rather than the
/// prior value, and a known `id` is carried over from prior state.
pub fn plan(prior_state: Option<Value>, proposed_state: Value) -> Result<PlanResult, ProviderError> {
    let prior = match prior_state {
        Some(state) if !state.is_null() => Some(EnvironmentVariableModel::from_state(state)?),
        _ => None,
    };

    if proposed_state.is_null() {
        let changes = prior
            .map(|p| {
                p.attribute_values()
                    .into_iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(name, v)| AttributeChange::removed(name, v))
                    .collect()
            })
            .unwrap_or_default();
        return Ok(PlanResult::destroy(changes));
    }

    let proposed = EnvironmentVariableModel::from_state(proposed_state)?;
    let mut planned = EnvironmentVariableModel {
        key: proposed.key,
        value: proposed.value,
        locked: Some(proposed.locked.unwrap_or(DEFAULT_LOCKED)),
        id: None,
    };

    let Some(prior) = prior else {
        let changes = planned
            .attribute_values()
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(name, v)| AttributeChange::added(name, v))
            .collect();
        return Ok(PlanResult::apply(planned.into_state()?, changes));
    };

    planned.id = prior.id.clone();
    let changes: Vec<_> = planned
        .attribute_values()
        .into_iter()
        .zip(prior.attribute_values())
        .filter(|((_, after), (_, before))| after != before)
        .map(|((name, after), (_, before))| AttributeChange::modified(name, before, after))
        .collect();

    if changes.is_empty() {
        Ok(PlanResult::unchanged(planned.into_state()?))
    } else {
        Ok(PlanResult::apply(planned.into_state()?, changes))
    }
}

/// Start managing an existing variable; the next read fills in the rest.
pub fn import(id: &str) -> Result<ImportedResource, ProviderError> {
    if id.is_empty() {
        return Err(ProviderError::InvalidState(
            "import requires the key of an existing environment variable".to_string(),
        ));
    }
    let model = EnvironmentVariableModel {
        id: Some(id.to_string()),
        ..Default::default()
    };
    Ok(ImportedResource::new(TYPE_NAME, model.into_state()?))
}

/// Lifecycle handler bound to a configured API client.
#[derive(Clone)]
pub struct EnvironmentVariableResource {
    client: Arc<dyn ChecklyApi>,
}

impl EnvironmentVariableResource {
    /// Create a handler using `client` for every remote call.
    pub fn new(client: Arc<dyn ChecklyApi>) -> Self {
        Self { client }
    }

    /// Create the variable and record its key as the resource ID.
    pub async fn create(&self, planned_state: Value) -> Result<Value, ProviderError> {
        let mut model = EnvironmentVariableModel::from_state(planned_state)?;

        let created = self
            .client
            .create_environment_variable(&model.to_remote())
            .await
            .map_err(|e| {
                ProviderError::remote("Creating environment variable with Checkly API failed", e)
            })?;

        model.locked = Some(model.locked.unwrap_or(DEFAULT_LOCKED));
        model.id = Some(created.key);

        trace!(
            variable = model.key.as_deref().unwrap_or_default(),
            locked = model.locked.unwrap_or(DEFAULT_LOCKED),
            id = model.id.as_deref().unwrap_or_default(),
            "created a new environment variable"
        );
        model.into_state()
    }

    /// Refresh state from the API.
    ///
    /// A variable the API no longer knows is reported with its ID cleared so
    /// the host drops it from state.
    pub async fn read(&self, current_state: Value) -> Result<Value, ProviderError> {
        let mut model = EnvironmentVariableModel::from_state(current_state)?;
        let id = model
            .remote_id()
            .ok_or_else(|| {
                ProviderError::InvalidState("environment variable state has no id".to_string())
            })?
            .to_string();

        match self.client.get_environment_variable(&id).await {
            Ok(remote) => {
                model.update_from_remote(&remote);
                trace!(
                    variable = %remote.key,
                    locked = remote.locked,
                    id = %id,
                    "read environment variable"
                );
            },
            Err(e) if e.is_not_found() => {
                debug!(
                    variable = model.key.as_deref().unwrap_or_default(),
                    id = %id,
                    "environment variable not found, assuming it was deleted"
                );
                model.id = None;
            },
            Err(e) => {
                return Err(ProviderError::remote(
                    "Getting environment variable with Checkly API failed",
                    e,
                ))
            },
        }

        model.into_state()
    }

    /// Push the planned attributes to the variable identified by prior state.
    pub async fn update(
        &self,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let prior = EnvironmentVariableModel::from_state(prior_state)?;
        let mut model = EnvironmentVariableModel::from_state(planned_state)?;
        let id = non_empty(model.id.as_deref())
            .or_else(|| prior.remote_id())
            .ok_or_else(|| {
                ProviderError::InvalidState("environment variable state has no id".to_string())
            })?
            .to_string();

        trace!(
            variable = model.key.as_deref().unwrap_or_default(),
            locked = model.locked.unwrap_or(DEFAULT_LOCKED),
            id = %id,
            "updating environment variable"
        );
        let updated = self
            .client
            .update_environment_variable(&id, &model.to_remote())
            .await
            .map_err(|e| {
                ProviderError::remote("Updating environment variable with Checkly API failed", e)
            })?;

        model.update_from_remote(&updated);
        trace!(
            variable = %updated.key,
            locked = updated.locked,
            id = model.id.as_deref().unwrap_or_default(),
            "updated environment variable"
        );
        model.into_state()
    }

    /// Delete the variable by key.
    pub async fn delete(&self, current_state: Value) -> Result<(), ProviderError> {
        let model = EnvironmentVariableModel::from_state(current_state)?;
        let key = non_empty(model.key.as_deref())
            .or_else(|| non_empty(model.id.as_deref()))
            .ok_or_else(|| {
                ProviderError::InvalidState("environment variable state has no key".to_string())
            })?;

        self.client
            .delete_environment_variable(key)
            .await
            .map_err(|e| {
                ProviderError::remote("Deleting environment variable with Checkly API failed", e)
            })?;

        trace!(
            variable = key,
            locked = model.locked.unwrap_or(DEFAULT_LOCKED),
            id = model.id.as_deref().unwrap_or_default(),
            "deleted environment variable"
        );
        Ok(())
    }
}
