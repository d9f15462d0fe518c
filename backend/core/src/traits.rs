use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::BridgeError;
use crate::message::{BotIdentity, ChannelRef, InboundMessage};

/// A persistent connection to a chat network.
///
/// One instance covers one connection lifetime: `connect` once, `disconnect`
/// once. Restarts build a fresh instance.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Human-readable transport name for logging.
    fn name(&self) -> &str;

    /// Log in with `credential` and start forwarding inbound messages to
    /// `inbound_tx` in receipt order. Returns once the session is established.
    async fn connect(
        &self,
        credential: &str,
        inbound_tx: mpsc::Sender<InboundMessage>,
    ) -> Result<BotIdentity, BridgeError>;

    /// Stop the session. No message is forwarded after this returns.
    async fn disconnect(&self) -> Result<(), BridgeError>;

    /// Post `text` to `channel`.
    async fn send(&self, channel: &ChannelRef, text: &str) -> Result<(), BridgeError>;
}

/// Request to a completion service: one system message, one user message.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_text: String,
}

/// Generation limits sent along with every completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionLimits {
    pub max_output_tokens: u32,
    pub sample_count: u32,
    pub temperature: f32,
}

/// Response from a completion service. Empty when the service produced no output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    pub candidates: Vec<String>,
}

/// An external text-completion service.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Service name (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a completion request. A non-success upstream status maps to
    /// [`BridgeError::CompletionService`].
    async fn request(
        &self,
        request: &CompletionRequest,
        limits: &CompletionLimits,
    ) -> Result<CompletionResponse, BridgeError>;
}
