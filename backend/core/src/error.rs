use thiserror::Error;

/// Top-level error type for the message pipeline and its collaborators.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("transport error ({transport}): {message}")]
    Transport { transport: String, message: String },

    #[error("unknown command: {0}")]
    CommandNotFound(String),

    #[error("command `{command}` failed for {user}: {reason}")]
    CommandExecution {
        command: String,
        user: String,
        reason: String,
    },

    #[error("completion service returned {status}: {body}")]
    CompletionService { status: u16, body: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BridgeError {
    pub fn transport(transport: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            transport: transport.into(),
            message: message.into(),
        }
    }
}
