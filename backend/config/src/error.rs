use std::path::PathBuf;
use thiserror::Error;

use crate::env::MissingEnvVarError;
use crate::validation::ValidationReport;

/// Why a configuration snapshot could not be produced.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("config file not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read config file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    EnvVar(#[from] MissingEnvVarError),

    #[error("invalid config file {}: {report}", path.display())]
    Invalid {
        path: PathBuf,
        report: ValidationReport,
    },
}
