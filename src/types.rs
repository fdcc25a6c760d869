//! Plan, import and metadata values exchanged with the host.
//!
//! Resource code works with these JSON-valued structs; the server turns them
//! into their byte-encoded protocol messages.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::generated;

/// The protocol version for the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// The handshake prefix output by the provider.
pub const HANDSHAKE_PREFIX: &str = "CHECKLY_PROVIDER";

/// The line written to stdout once the gRPC listener is bound.
pub fn handshake_line(addr: SocketAddr) -> String {
    format!("{HANDSHAKE_PREFIX}|{PROTOCOL_VERSION}|{addr}")
}

/// One attribute whose value differs between prior and planned state.
///
/// A missing `before` means the attribute is being set for the first time,
/// a missing `after` means it goes away with the resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Attribute name, e.g. `locked`.
    pub path: String,
    /// Prior value.
    pub before: Option<Value>,
    /// Planned value.
    pub after: Option<Value>,
}

impl AttributeChange {
    /// An attribute appearing on create.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self { path: path.into(), before: None, after: Some(value) }
    }

    /// An attribute disappearing on destroy.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self { path: path.into(), before: Some(value), after: None }
    }

    /// An attribute changing in place.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self { path: path.into(), before: Some(before), after: Some(after) }
    }
}

// An absent side travels as empty bytes.
fn side_bytes(side: Option<Value>) -> Vec<u8> {
    side.and_then(|v| serde_json::to_vec(&v).ok()).unwrap_or_default()
}

impl From<AttributeChange> for generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        Self {
            path: change.path,
            before: side_bytes(change.before),
            after: side_bytes(change.after),
        }
    }
}

/// Outcome of planning one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// State the apply step will receive, null for a destroy.
    pub planned_state: Value,
    /// Per-attribute differences against prior state.
    pub changes: Vec<AttributeChange>,
    /// Whether the change forces delete-then-create.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Planned state equals prior state.
    pub fn unchanged(state: Value) -> Self {
        Self::apply(state, Vec::new())
    }

    /// A create or in-place update landing on `planned_state`.
    pub fn apply(planned_state: Value, changes: Vec<AttributeChange>) -> Self {
        Self { planned_state, changes, requires_replace: false }
    }

    /// Removal of the resource; every change should be [`AttributeChange::removed`].
    pub fn destroy(changes: Vec<AttributeChange>) -> Self {
        Self::apply(Value::Null, changes)
    }

    /// True when the plan removes the resource.
    pub fn is_destroy(&self) -> bool {
        self.planned_state.is_null()
    }
}

/// A resource adopted through `ImportResourceState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// Resource type name.
    pub resource_type: String,
    /// State placeholder the host refreshes with a Read.
    pub state: Value,
}

impl ImportedResource {
    /// Pair a resource type with its imported state.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self { resource_type: resource_type.into(), state }
    }
}

impl From<ImportedResource> for generated::ImportedResource {
    fn from(imported: ImportedResource) -> Self {
        Self {
            resource_type: imported.resource_type,
            state: serde_json::to_vec(&imported.state).unwrap_or_default(),
        }
    }
}

/// What `GetMetadata` reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Managed resource type names.
    pub resources: Vec<String>,
    /// Capability flags.
    pub capabilities: ServerCapabilities,
    /// Release version, "dev" for local builds.
    pub version: String,
}

/// Capability flags advertised to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Plan is called with a null proposed state before destroy.
    pub plan_destroy: bool,
}

impl From<ProviderMetadata> for generated::GetMetadataResponse {
    fn from(metadata: ProviderMetadata) -> Self {
        Self {
            server_capabilities: Some(generated::ServerCapabilities {
                plan_destroy: metadata.capabilities.plan_destroy,
            }),
            resources: metadata.resources,
            diagnostics: vec![],
            version: metadata.version,
        }
    }
}
