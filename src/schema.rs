//! Provider and resource schemas, plus the diagnostics reported against them.
//!
//! Attributes are kept in name order so `GetSchema` responses and validation
//! diagnostics come out the same way on every run.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::generated;

/// Value type of an attribute. The Checkly resources only need these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// JSON string.
    String,
    /// JSON boolean.
    Bool,
}

impl AttributeType {
    /// Name used in type mismatch diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
        }
    }

    /// Whether `value` (non-null) has this type.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Bool => value.is_boolean(),
        }
    }
}

/// Who supplies an attribute's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// Configuration must set it.
    Required,
    /// Configuration may set it.
    Optional,
    /// Only the provider sets it.
    Computed,
    /// Configuration may set it, otherwise the provider fills it in.
    OptionalComputed,
}

impl Presence {
    /// Must appear in configuration.
    pub fn is_required(self) -> bool {
        self == Self::Required
    }

    /// May be left out of configuration.
    pub fn is_optional(self) -> bool {
        matches!(self, Self::Optional | Self::OptionalComputed)
    }

    /// Provider may write the value.
    pub fn is_computed(self) -> bool {
        matches!(self, Self::Computed | Self::OptionalComputed)
    }

    /// Configuration has any say over the value.
    pub fn is_configurable(self) -> bool {
        self != Self::Computed
    }
}

/// One named attribute of a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Value type.
    #[serde(rename = "type")]
    pub kind: AttributeType,
    /// Who supplies the value.
    pub presence: Presence,
    /// Hide the value in plan output and logs.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
    /// Shown by the host in documentation and errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Value planned when configuration omits the attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl Attribute {
    fn of(kind: AttributeType, presence: Presence) -> Self {
        Self { kind, presence, sensitive: false, description: None, default: None }
    }

    /// A string configuration must set.
    pub fn required_string() -> Self {
        Self::of(AttributeType::String, Presence::Required)
    }

    /// A string configuration may set.
    pub fn optional_string() -> Self {
        Self::of(AttributeType::String, Presence::Optional)
    }

    /// A read-only string the provider assigns, such as an id.
    pub fn computed_string() -> Self {
        Self::of(AttributeType::String, Presence::Computed)
    }

    /// A bool the provider fills in when configuration leaves it out.
    pub fn optional_computed_bool() -> Self {
        Self::of(AttributeType::Bool, Presence::OptionalComputed)
    }

    #[allow(missing_docs)]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[allow(missing_docs)]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Mark the value as secret.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// Attribute set of the provider block or of one resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Schema {
    /// Bumped when stored state needs an upgrade.
    #[serde(default)]
    pub version: u64,
    /// Human-readable summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Attributes by name.
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    /// An empty schema at version 0.
    pub fn v0() -> Self {
        Self::default()
    }

    /// Add or replace an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    #[allow(missing_docs)]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Names of attributes configuration must set, in name order.
    pub fn required_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter(|(_, attr)| attr.presence.is_required())
            .map(|(name, _)| name.as_str())
    }
}

impl From<&Schema> for generated::Schema {
    fn from(schema: &Schema) -> Self {
        let attributes = schema
            .attributes
            .iter()
            .map(|(name, attr)| generated::Attribute {
                name: name.clone(),
                r#type: serde_json::to_vec(&attr.kind).unwrap_or_default(),
                required: attr.presence.is_required(),
                optional: attr.presence.is_optional(),
                computed: attr.presence.is_computed(),
                sensitive: attr.sensitive,
                description: attr.description.clone().unwrap_or_default(),
                default_value: attr
                    .default
                    .as_ref()
                    .and_then(|v| serde_json::to_vec(v).ok())
                    .unwrap_or_default(),
            })
            .collect();

        Self {
            version: schema.version as i64,
            block: Some(generated::Block {
                attributes,
                description: schema.description.clone().unwrap_or_default(),
            }),
        }
    }
}

/// Everything `GetSchema` returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// The provider configuration block.
    #[serde(default)]
    pub provider: Schema,
    /// Resource schemas keyed by type name.
    #[serde(default)]
    pub resources: HashMap<String, Schema>,
}

impl ProviderSchema {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider configuration schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Register a resource type.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// The operation failed.
    Error,
    /// The operation went ahead but the user should look at this.
    Warning,
}

/// A message for the user, optionally tied to one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    #[allow(missing_docs)]
    pub severity: DiagnosticSeverity,
    /// One-line headline.
    pub summary: String,
    /// Longer explanation, usually how to fix it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Attribute the message is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    fn with_severity(severity: DiagnosticSeverity, summary: impl Into<String>) -> Self {
        Self { severity, summary: summary.into(), detail: None, attribute: None }
    }

    /// An error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Error, summary)
    }

    /// A warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Warning, summary)
    }

    #[allow(missing_docs)]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[allow(missing_docs)]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    #[allow(missing_docs)]
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl From<Diagnostic> for generated::Diagnostic {
    fn from(d: Diagnostic) -> Self {
        let severity = match d.severity {
            DiagnosticSeverity::Error => generated::diagnostic::Severity::Error,
            DiagnosticSeverity::Warning => generated::diagnostic::Severity::Warning,
        };
        Self {
            severity: severity as i32,
            summary: d.summary,
            detail: d.detail.unwrap_or_default(),
            attribute: d.attribute.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn variable_schema() -> Schema {
        Schema::v0()
            .with_description("Environment variable")
            .with_attribute("value", Attribute::required_string().sensitive())
            .with_attribute("key", Attribute::required_string())
            .with_attribute(
                "locked",
                Attribute::optional_computed_bool().with_default(json!(false)),
            )
            .with_attribute("id", Attribute::computed_string())
    }

    #[test]
    fn test_locked_is_optional_computed_with_default() {
        let schema = variable_schema();
        let locked = schema.attribute("locked").unwrap();
        assert!(locked.presence.is_optional());
        assert!(locked.presence.is_computed());
        assert!(!locked.presence.is_required());
        assert_eq!(locked.default, Some(json!(false)));

        let id = schema.attribute("id").unwrap();
        assert!(!id.presence.is_configurable());
    }

    #[test]
    fn test_required_attributes_in_name_order() {
        let schema = variable_schema();
        let names: Vec<_> = schema.required_attributes().collect();
        assert_eq!(names, ["key", "value"]);
    }

    #[test]
    fn test_attribute_type_accepts() {
        assert!(AttributeType::Bool.accepts(&json!(true)));
        assert!(!AttributeType::Bool.accepts(&json!("true")));
        assert!(AttributeType::String.accepts(&json!("API_TOKEN")));
        assert!(!AttributeType::String.accepts(&json!(1)));
    }

    #[test]
    fn test_variable_schema_to_proto() {
        let proto: generated::Schema = (&variable_schema()).into();
        assert_eq!(proto.version, 0);
        let block = proto.block.unwrap();
        assert_eq!(block.description, "Environment variable");

        let names: Vec<_> = block.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["id", "key", "locked", "value"]);

        let locked = &block.attributes[2];
        assert_eq!(locked.r#type, b"\"bool\"".to_vec());
        assert!(locked.optional && locked.computed && !locked.required);
        assert_eq!(locked.default_value, b"false".to_vec());

        let value = &block.attributes[3];
        assert!(value.required && value.sensitive);
        assert!(value.default_value.is_empty());

        let id = &block.attributes[0];
        assert!(id.computed && !id.optional);
    }

    #[test]
    fn test_sensitive_flag_omitted_when_false() {
        let json = serde_json::to_value(Attribute::required_string()).unwrap();
        assert_eq!(json, json!({"type": "string", "presence": "required"}));

        let json = serde_json::to_value(Attribute::optional_string().sensitive()).unwrap();
        assert_eq!(json["sensitive"], true);
    }

    #[test]
    fn test_warning_diagnostic_to_proto() {
        let proto: generated::Diagnostic = Diagnostic::warning("Missing Checkly API key")
            .with_attribute("api_key")
            .into();
        assert_eq!(proto.severity, generated::diagnostic::Severity::Warning as i32);
        assert_eq!(proto.attribute, "api_key");
        assert!(proto.detail.is_empty());
    }
}
