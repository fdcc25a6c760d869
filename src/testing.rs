//! Testing utilities for the provider.
//!
//! [`ProviderTester`] drives a `ProviderService` implementation without
//! spinning up a gRPC server, and [`InMemoryChecklyApi`] stands in for the
//! Checkly API so resource handlers can be exercised offline.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use checkly_provider::testing::{InMemoryChecklyApi, ProviderTester};
//! use checkly_provider::ChecklyProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_variable() {
//!     let api = Arc::new(InMemoryChecklyApi::new());
//!     let tester = ProviderTester::new(ChecklyProvider::with_client("test", api.clone()));
//!
//!     let state = tester
//!         .lifecycle_create("checkly_environment_variable", json!({
//!             "key": "API_TOKEN",
//!             "value": "secret"
//!         }))
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(state["id"], "API_TOKEN");
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{ChecklyApi, EnvironmentVariable};
use crate::error::{ApiError, ProviderError};
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// A test harness for provider implementations.
///
/// This wraps a `ProviderService` implementation and provides
/// simplified methods for testing without a gRPC server.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Upgrade resource state from an older schema version.
    pub async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .upgrade_resource_state(resource_type, version, state)
            .await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Run a full create lifecycle: plan → create → read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self.plan_create(resource_type, config).await?;
        let created_state = self
            .create(resource_type, plan_result.planned_state)
            .await?;
        self.read(resource_type, created_state).await
    }

    /// Run a full update lifecycle: plan → update → read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated_state = self
            .update(resource_type, prior_state, plan_result.planned_state)
            .await?;
        self.read(resource_type, updated_state).await
    }

    /// Run a full delete lifecycle: plan → delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        let plan_result = self
            .plan_delete(resource_type, current_state.clone())
            .await?;
        debug_assert!(plan_result.is_destroy());
        self.delete(resource_type, current_state).await
    }

    /// Run an import lifecycle: import → read.
    ///
    /// Returns the state of the single imported resource after read.
    pub async fn lifecycle_import(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Value, ProviderError> {
        let mut imported = self.import_resource(resource_type, id).await?;
        if imported.len() != 1 {
            return Err(ProviderError::InvalidState(format!(
                "expected exactly one imported resource, got {}",
                imported.len()
            )));
        }
        let resource = imported.remove(0);
        self.read(&resource.resource_type, resource.state).await
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

/// Check diagnostics and return an error if there are any errors.
fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// In-memory Checkly API
// =========================================================================

/// In-memory stand-in for the Checkly environment variable API.
///
/// Unknown keys answer with [`ApiError::NotFound`]. After
/// [`fail_with`](Self::fail_with) every call fails with the given status.
#[derive(Debug, Default)]
pub struct InMemoryChecklyApi {
    variables: Mutex<HashMap<String, EnvironmentVariable>>,
    failure: Mutex<Option<(u16, String)>>,
}

impl InMemoryChecklyApi {
    /// Create an empty API.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a variable as if it had been created out of band.
    pub fn insert(&self, variable: EnvironmentVariable) {
        self.variables().insert(variable.key.clone(), variable);
    }

    /// Look up a stored variable.
    pub fn get(&self, key: &str) -> Option<EnvironmentVariable> {
        self.variables().get(key).cloned()
    }

    /// Remove a variable as if it had been deleted out of band.
    pub fn remove(&self, key: &str) -> Option<EnvironmentVariable> {
        self.variables().remove(key)
    }

    /// Number of stored variables.
    pub fn len(&self) -> usize {
        self.variables().len()
    }

    /// Whether no variables are stored.
    pub fn is_empty(&self) -> bool {
        self.variables().is_empty()
    }

    /// Make every subsequent call fail with `status` and `body`.
    pub fn fail_with(&self, status: u16, body: &str) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((status, body.to_string()));
    }

    fn variables(&self) -> MutexGuard<'_, HashMap<String, EnvironmentVariable>> {
        self.variables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_failure(&self) -> Result<(), ApiError> {
        match &*self.failure.lock().unwrap_or_else(PoisonError::into_inner) {
            Some((404, body)) => Err(ApiError::NotFound(body.clone())),
            Some((status, body)) => Err(ApiError::Status {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn not_found(key: &str) -> ApiError {
    ApiError::NotFound(format!("environment variable {:?} not found", key))
}

impl InMemoryChecklyApi {
    /// Store a new variable; an existing key answers 409.
    ///
    /// The `try_*` methods are the store semantics behind [`ChecklyApi`],
    /// callable without a runtime, e.g. from an HTTP mock responder.
    pub fn try_create(&self, variable: &EnvironmentVariable) -> Result<EnvironmentVariable, ApiError> {
        self.check_failure()?;
        let mut variables = self.variables();
        if variables.contains_key(&variable.key) {
            return Err(ApiError::Status {
                status: 409,
                body: format!("environment variable {:?} already exists", variable.key),
            });
        }
        variables.insert(variable.key.clone(), variable.clone());
        Ok(variable.clone())
    }

    /// Fetch the variable stored under `key`.
    pub fn try_get(&self, key: &str) -> Result<EnvironmentVariable, ApiError> {
        self.check_failure()?;
        self.get(key).ok_or_else(|| not_found(key))
    }

    /// Replace the variable under `key`, moving it when the key changes.
    pub fn try_update(
        &self,
        key: &str,
        variable: &EnvironmentVariable,
    ) -> Result<EnvironmentVariable, ApiError> {
        self.check_failure()?;
        let mut variables = self.variables();
        if variables.remove(key).is_none() {
            return Err(not_found(key));
        }
        variables.insert(variable.key.clone(), variable.clone());
        Ok(variable.clone())
    }

    /// Delete the variable under `key`.
    pub fn try_delete(&self, key: &str) -> Result<(), ApiError> {
        self.check_failure()?;
        self.variables()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| not_found(key))
    }
}

#[async_trait]
impl ChecklyApi for InMemoryChecklyApi {
    async fn create_environment_variable(
        &self,
        variable: &EnvironmentVariable,
    ) -> Result<EnvironmentVariable, ApiError> {
        self.try_create(variable)
    }

    async fn get_environment_variable(&self, key: &str) -> Result<EnvironmentVariable, ApiError> {
        self.try_get(key)
    }

    async fn update_environment_variable(
        &self,
        key: &str,
        variable: &EnvironmentVariable,
    ) -> Result<EnvironmentVariable, ApiError> {
        self.try_update(key, variable)
    }

    async fn delete_environment_variable(&self, key: &str) -> Result<(), ApiError> {
        self.try_delete(key)
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates the resource will be created.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(
        !plan.requires_replace,
        "Expected plan to create, not replace"
    );
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan does not require resource replacement.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan does not have a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan has a change for the given path.
pub fn assert_plan_does_not_change_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        !has_change,
        "Expected plan to not change attribute '{}', but it was changed",
        path
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ChecklyProvider;
    use crate::resources::environment_variable::TYPE_NAME;
    use serde_json::json;
    use std::sync::Arc;

    fn tester() -> (ProviderTester<ChecklyProvider>, Arc<InMemoryChecklyApi>) {
        let api = Arc::new(InMemoryChecklyApi::new());
        let provider = ChecklyProvider::with_client("test", api.clone());
        (ProviderTester::new(provider), api)
    }

    fn variable(key: &str, value: &str, locked: bool) -> EnvironmentVariable {
        EnvironmentVariable {
            key: key.to_string(),
            value: value.to_string(),
            locked,
        }
    }

    #[tokio::test]
    async fn test_tester_resource_types() {
        let (tester, _) = tester();
        assert_eq!(tester.resource_types(), vec![TYPE_NAME.to_string()]);
        assert!(tester.schema().resources.contains_key(TYPE_NAME));
    }

    #[tokio::test]
    async fn test_tester_plan_create() {
        let (tester, _) = tester();
        let plan = tester
            .plan_create(TYPE_NAME, json!({"key": "one", "value": "secret"}))
            .await
            .unwrap();

        assert_plan_creates(&plan);
        assert_plan_changes_attribute(&plan, "locked");
        assert_plan_does_not_change_attribute(&plan, "id");
    }

    #[tokio::test]
    async fn test_tester_plan_update_no_changes() {
        let (tester, _) = tester();
        let state = json!({"key": "one", "value": "secret", "locked": false, "id": "one"});
        let plan = tester
            .plan_update(TYPE_NAME, state.clone(), state)
            .await
            .unwrap();

        assert_plan_no_changes(&plan);
        assert_plan_updates_in_place(&plan);
    }

    #[tokio::test]
    async fn test_tester_lifecycle_create_and_delete() {
        let (tester, api) = tester();
        let state = tester
            .lifecycle_create(TYPE_NAME, json!({"key": "one", "value": "secret"}))
            .await
            .unwrap();

        assert_eq!(state["id"], "one");
        assert_eq!(api.len(), 1);

        tester.lifecycle_delete(TYPE_NAME, state).await.unwrap();
        assert!(api.is_empty());
    }

    #[tokio::test]
    async fn test_tester_lifecycle_import() {
        let (tester, api) = tester();
        api.insert(variable("one", "secret", true));

        let state = tester.lifecycle_import(TYPE_NAME, "one").await.unwrap();
        assert_eq!(
            state,
            json!({"key": "one", "value": "secret", "locked": true, "id": "one"})
        );
    }

    #[tokio::test]
    async fn test_in_memory_api_semantics() {
        let api = InMemoryChecklyApi::new();
        api.create_environment_variable(&variable("one", "a", false))
            .await
            .unwrap();

        let err = api
            .create_environment_variable(&variable("one", "b", false))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 409, .. }));

        let err = api.get_environment_variable("two").await.unwrap_err();
        assert!(err.is_not_found());

        api.update_environment_variable("one", &variable("two", "b", true))
            .await
            .unwrap();
        assert!(api.get("one").is_none());
        assert_eq!(api.get("two"), Some(variable("two", "b", true)));

        api.fail_with(503, "unavailable");
        assert!(matches!(
            api.delete_environment_variable("two").await,
            Err(ApiError::Status { status: 503, .. })
        ));
    }

    #[test]
    fn test_assert_no_errors() {
        let diagnostics = vec![Diagnostic::warning("Just a warning")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        let diagnostics = vec![Diagnostic::error("An error")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    fn test_assert_error_contains() {
        let diagnostics = vec![Diagnostic::error("Missing Checkly account ID")];
        assert_error_contains(&diagnostics, "Missing");
        assert_error_contains(&diagnostics, "account ID");
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("key"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("First error"));
        assert!(display.contains("Second error"));
        assert!(display.contains("(at key)"));
        assert!(display.contains("More info"));
    }
}
