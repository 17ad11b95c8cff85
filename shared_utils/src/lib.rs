//! Small helpers shared by the workspace binaries: environment lookups and
//! directory checks used while resolving configuration.

pub mod config;
pub mod env;

pub use config::{ConfigError, require_dir};
pub use env::{MissingEnvVarError, get_env_var, get_env_var_or};
