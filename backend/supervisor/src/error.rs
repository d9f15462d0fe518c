use thiserror::Error;

use chatbridge_config::ConfigLoadError;
use chatbridge_core::BridgeError;

/// Why a start or restart cycle did not produce a running transport.
#[derive(Debug, Error)]
pub enum RestartError {
    #[error(transparent)]
    Config(#[from] ConfigLoadError),

    #[error("transport failed to start: {0}")]
    Transport(#[from] BridgeError),

    #[error("coordinator is shut down")]
    Closed,
}
