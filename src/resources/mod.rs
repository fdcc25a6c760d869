//! Resources exposed by the provider.

pub mod environment_variable;

pub use environment_variable::{EnvironmentVariableModel, EnvironmentVariableResource};
