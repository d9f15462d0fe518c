pub mod dispatch;
pub mod handlers;
pub mod registry;
pub mod types;

pub use dispatch::{CommandContext, CommandExecutor, CommandHandler};
pub use handlers::{HelpHandler, TranslateHandler};
pub use registry::{builtin_commands, CommandRegistry};
pub use types::{CommandCategory, CommandDef, CommandInvocation};

use std::sync::Arc;

use chatbridge_completion::CompletionBridge;

/// Register every built-in command with `executor`.
///
/// Translation commands use their own key as the directive key.
pub fn register_builtin_handlers(
    executor: &mut CommandExecutor,
    bridge: Arc<CompletionBridge>,
    prefix: char,
) {
    let registry = CommandRegistry::new();
    for def in registry.all() {
        let handler: Arc<dyn CommandHandler> = match def.category {
            CommandCategory::Info => Arc::new(HelpHandler {
                registry: registry.clone(),
                prefix,
            }),
            CommandCategory::Translation => Arc::new(TranslateHandler {
                directive_key: def.key.clone(),
                bridge: Arc::clone(&bridge),
            }),
        };
        executor.register(def, handler);
    }
}
