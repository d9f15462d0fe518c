use std::sync::Arc;

use tracing::debug;

use chatbridge_config::BridgeConfig;
use chatbridge_core::{BridgeError, CompletionLimits, CompletionRequest, CompletionService};

/// Limits sent with every translation request.
pub const COMPLETION_LIMITS: CompletionLimits = CompletionLimits {
    max_output_tokens: 250,
    sample_count: 1,
    temperature: 0.8,
};

/// Adapter from command handlers to a [`CompletionService`], bound to the
/// configuration snapshot that was active when it was built.
pub struct CompletionBridge {
    config: Arc<BridgeConfig>,
    service: Arc<dyn CompletionService>,
}

impl CompletionBridge {
    pub fn new(config: Arc<BridgeConfig>, service: Arc<dyn CompletionService>) -> Self {
        Self { config, service }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Complete `input_text` with the directive for `directive_key` as the system prompt.
    ///
    /// A missing directive sends an empty system prompt. A response with no
    /// candidate yields `""`.
    pub async fn complete(&self, directive_key: &str, input_text: &str) -> Result<String, BridgeError> {
        let request = CompletionRequest {
            system_prompt: self.config.directive(directive_key).to_string(),
            user_text: input_text.to_string(),
        };
        debug!(
            service = self.service.name(),
            directive = directive_key,
            has_directive = !request.system_prompt.is_empty(),
            "Requesting completion"
        );

        let response = self.service.request(&request, &COMPLETION_LIMITS).await?;
        Ok(response
            .candidates
            .first()
            .map(|text| text.trim().to_string())
            .unwrap_or_default())
    }
}
