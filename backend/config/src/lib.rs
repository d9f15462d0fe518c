//! `chatbridge-config`: the bot's configuration snapshot.
//!
//! Provides:
//! - Typed JSON schema (`BridgeConfig`, `Directive`)
//! - `${ENV_VAR}` substitution
//! - Validation with errors and warnings
//! - Redaction for safe display
//! - `ConfigStore`: atomic snapshot swap plus file watching

pub mod env;
pub mod error;
pub mod io;
pub mod redact;
pub mod schema;
pub mod store;
pub mod validation;

pub use env::{resolve_env_vars, resolve_env_vars_except, resolve_env_vars_with, MissingEnvVarError};
pub use error::ConfigLoadError;
pub use io::{default_config_path, load_config, parse_config, CONFIG_FILE_NAME};
pub use redact::{redact, redacted_snapshot};
pub use schema::{BridgeConfig, Directive};
pub use store::{ConfigStore, ConfigWatcher};
pub use validation::{validate, ConfigValidationError, ValidationReport};
