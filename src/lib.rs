//! Checkly provider plugin.
//!
//! Manages [Checkly](https://www.checklyhq.com) account environment
//! variables through the provider plugin protocol. The host spawns the
//! binary, reads the handshake line from stdout and drives the provider over
//! gRPC with JSON-encoded configuration and state.
//!
//! # Resources
//!
//! - `checkly_environment_variable`: a key/value pair shared by all checks of
//!   an account, optionally `locked` to hide the value in the Checkly UI.
//!
//! # Configuration
//!
//! See [`config`] for how `api_key`, `api_url` and `account_id` are resolved
//! from the provider block and the `CHECKLY_*` environment variables.
//!
//! # Handshake Protocol
//!
//! When the provider starts via [`serve`], it outputs a handshake string to stdout:
//!
//! ```text
//! CHECKLY_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `CHECKLY_PROVIDER|<protocol_version>|<address>`
//!
//! # Provider Protocol
//!
//! - **GetMetadata**: Returns capabilities, resource names and release version
//! - **GetSchema**: Returns the schema for provider config and resources
//! - **ValidateProviderConfig** / **Configure**: Checks and applies provider settings
//! - **Stop**: Gracefully shuts down the provider
//! - **ValidateResourceConfig**: Validates resource configuration
//! - **UpgradeResourceState**: Migrates state from older schema versions
//! - **Plan**: Calculates required changes
//! - **Create/Read/Update/Delete**: CRUD operations for resources
//! - **ImportResourceState**: Adopts an existing variable by key

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

// Re-export main types at crate root
pub use client::{ChecklyApi, ChecklyClient, EnvironmentVariable};
pub use config::{ConnectionSettings, ProviderConfig};
pub use error::{ApiError, ProviderError};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::ChecklyProvider;
pub use schema::ProviderSchema;
pub use server::{serve, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    handshake_line, AttributeChange, ImportedResource, PlanResult, ProviderMetadata,
    ServerCapabilities, HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::validate;
