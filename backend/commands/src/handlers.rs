//! Built-in command handlers.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use chatbridge_completion::CompletionBridge;

use crate::dispatch::{CommandContext, CommandHandler};
use crate::registry::CommandRegistry;
use crate::types::{CommandCategory, CommandInvocation};

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

pub struct HelpHandler {
    pub registry: CommandRegistry,
    pub prefix: char,
}

impl HelpHandler {
    fn usage_text(&self, user: &str) -> String {
        let mut lines = vec![format!(
            "[{user}], this bot translates the text you type into other styles of speech."
        )];
        for cmd in self
            .registry
            .all()
            .iter()
            .filter(|c| c.category == CommandCategory::Translation)
        {
            let usage = if cmd.usage.is_empty() {
                String::new()
            } else {
                format!(" {}", cmd.usage)
            };
            lines.push(format!(
                "Use '{}{}{}': {}",
                self.prefix, cmd.key, usage, cmd.summary
            ));
        }
        lines.join("\n")
    }
}

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn handle(&self, ctx: &CommandContext, _inv: &CommandInvocation) -> Result<()> {
        ctx.reply(&self.usage_text(&ctx.user.name)).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// tlap, zapp
// ---------------------------------------------------------------------------

/// Sends the remainder through the completion service using the directive
/// keyed by `directive_key`, then replies with the result.
pub struct TranslateHandler {
    pub directive_key: String,
    pub bridge: Arc<CompletionBridge>,
}

#[async_trait]
impl CommandHandler for TranslateHandler {
    async fn handle(&self, ctx: &CommandContext, inv: &CommandInvocation) -> Result<()> {
        if inv.remainder.is_empty() {
            bail!("The input text has too few parameters.");
        }
        let translated = self.bridge.complete(&self.directive_key, &inv.remainder).await?;
        if translated.is_empty() {
            debug!(invocation = %inv.id, "Completion returned no text; not replying");
            return Ok(());
        }
        ctx.reply(&translated).await?;
        Ok(())
    }
}
