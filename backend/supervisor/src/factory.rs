use std::sync::Arc;

use chatbridge_channels::DiscordTransport;
use chatbridge_completion::providers::OpenAiProvider;
use chatbridge_config::BridgeConfig;
use chatbridge_core::{ChatTransport, CompletionService};

/// Builds the external collaborators for one runtime generation.
///
/// Called once per start or restart with the snapshot being applied; every
/// call must return fresh instances.
pub trait ServiceFactory: Send + Sync {
    fn transport(&self, config: &BridgeConfig) -> Arc<dyn ChatTransport>;
    fn completion(&self, config: &BridgeConfig) -> Arc<dyn CompletionService>;
}

/// Discord transport plus OpenAI completions.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscordServices;

impl ServiceFactory for DiscordServices {
    fn transport(&self, _config: &BridgeConfig) -> Arc<dyn ChatTransport> {
        Arc::new(DiscordTransport::new())
    }

    fn completion(&self, config: &BridgeConfig) -> Arc<dyn CompletionService> {
        Arc::new(OpenAiProvider::from_config(config))
    }
}
