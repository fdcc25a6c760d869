//! Schema validation helpers.
//!
//! Validates a configuration `serde_json::Value` against a [`Schema`] and
//! reports every problem as a [`Diagnostic`] pointing at the attribute.
//!
//! # Example
//!
//! ```
//! use checkly_provider::schema::{Attribute, Schema};
//! use checkly_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("key", Attribute::required_string())
//!     .with_attribute("locked", Attribute::optional_computed_bool());
//!
//! let diagnostics = validate(&schema, &json!({"key": "API_TOKEN", "locked": true}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"key": "API_TOKEN", "locked": "yes"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("locked".to_string()));
//! ```

use crate::schema::{Attribute, Diagnostic, Schema};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed-only attributes are skipped (provider sets these)
/// - Attribute types must match the schema
/// - Attributes not present in the schema are rejected
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        // An absent configuration block is equivalent to an empty one.
        Value::Null => {
            check_required(schema, &serde_json::Map::new(), &mut diagnostics);
            return diagnostics;
        },
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        },
    };

    check_required(schema, obj, &mut diagnostics);

    for (name, attr_value) in obj {
        match schema.attribute(name) {
            Some(attr) => validate_attribute(attr, attr_value, name, &mut diagnostics),
            None => diagnostics.push(
                Diagnostic::error(format!("Unsupported attribute '{}'", name))
                    .with_detail("An attribute with this name is not expected here")
                    .with_attribute(name.as_str()),
            ),
        }
    }

    diagnostics
}

fn check_required(
    schema: &Schema,
    obj: &serde_json::Map<String, Value>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for name in schema.required_attributes() {
        if matches!(obj.get(name), None | Some(Value::Null)) {
            diagnostics.push(
                Diagnostic::error(format!("Missing required attribute '{}'", name))
                    .with_detail("This attribute is required and must be provided")
                    .with_attribute(name),
            );
        }
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Computed-only attributes are owned by the provider
    if !attr.presence.is_configurable() || value.is_null() {
        return;
    }

    if !attr.kind.accepts(value) {
        diagnostics.push(type_error(path, attr.kind.name(), value));
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        ))
        .with_attribute(path)
}
