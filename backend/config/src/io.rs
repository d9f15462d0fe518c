//! Config file resolution and loading.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::env::resolve_env_vars_except;

/// Fields whose string values are taken literally, never env-substituted.
const VERBATIM_FIELDS: &[&str] = &["Directives", "directives"];
use crate::error::ConfigLoadError;
use crate::schema::BridgeConfig;
use crate::validation::validate;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Resolve the config file path.
/// Priority: `CHATBRIDGE_CONFIG` env > `config.json` beside the executable > `./config.json`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("CHATBRIDGE_CONFIG") {
        return PathBuf::from(path);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Read, substitute env vars, deserialize and validate the config at `path`.
pub async fn load_config(path: &Path) -> Result<BridgeConfig, ConfigLoadError> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigLoadError::Missing {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(ConfigLoadError::Unreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    parse_config(&raw, path)
}

/// Parse raw JSON text into a validated snapshot. `path` is used for error context only.
pub fn parse_config(raw: &str, path: &Path) -> Result<BridgeConfig, ConfigLoadError> {
    let malformed = |source| ConfigLoadError::Malformed {
        path: path.to_path_buf(),
        source,
    };

    let value: Value = serde_json::from_str(raw).map_err(malformed)?;
    let value = resolve_env_vars_except(&value, VERBATIM_FIELDS)?;
    let config: BridgeConfig = serde_json::from_value(value).map_err(malformed)?;

    let report = validate(&config);
    for warning in &report.warnings {
        warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if !report.is_valid() {
        return Err(ConfigLoadError::Invalid {
            path: path.to_path_buf(),
            report,
        });
    }

    debug!(
        path = %path.display(),
        directives = config.directives.len(),
        "Parsed config"
    );
    Ok(config)
}
