//! Resolves an invocation to its handler and runs it.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use chatbridge_core::{Author, BridgeError, ChannelRef, ChatTransport};

use crate::types::{CommandDef, CommandInvocation};

// ---------------------------------------------------------------------------
// Handler trait
// ---------------------------------------------------------------------------

/// Context passed to every command handler.
pub struct CommandContext {
    pub user: Author,
    pub channel: ChannelRef,
    transport: Arc<dyn ChatTransport>,
}

impl CommandContext {
    /// Send `text` to the channel the command came from.
    pub async fn reply(&self, text: &str) -> Result<(), BridgeError> {
        self.transport.send(&self.channel, text).await
    }
}

/// A command implementation. Any reply is the handler's own business.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: &CommandContext, inv: &CommandInvocation) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

struct Registered {
    key: String,
    handler: Arc<dyn CommandHandler>,
}

/// Runs invocations against the handlers registered for one transport.
pub struct CommandExecutor {
    handlers: HashMap<String, Registered>,
    transport: Arc<dyn ChatTransport>,
}

impl CommandExecutor {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            handlers: HashMap::new(),
            transport,
        }
    }

    /// Register `handler` under the command key and every alias.
    pub fn register(&mut self, def: &CommandDef, handler: Arc<dyn CommandHandler>) {
        for name in def.names() {
            self.handlers.insert(
                name.to_lowercase(),
                Registered {
                    key: def.key.clone(),
                    handler: Arc::clone(&handler),
                },
            );
        }
        info!("Command '{}' registered", def.key);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers.contains_key(&name.to_lowercase())
    }

    /// Run one invocation.
    ///
    /// Unknown commands are logged and produce no reply. Handler failures are
    /// reported to the origin channel with the user's name and the reason.
    pub async fn execute(&self, inv: &CommandInvocation) -> Result<(), BridgeError> {
        let user = &inv.origin_user.name;

        let Some(registered) = self.handlers.get(&inv.command_name.to_lowercase()) else {
            error!(
                invocation = %inv.id,
                "Command failed to execute for [{}] <-> [Unknown command: {}]!",
                user,
                inv.command_name
            );
            return Err(BridgeError::CommandNotFound(inv.command_name.clone()));
        };

        let ctx = CommandContext {
            user: inv.origin_user.clone(),
            channel: inv.origin_channel.clone(),
            transport: Arc::clone(&self.transport),
        };

        match registered.handler.handle(&ctx, inv).await {
            Ok(()) => {
                info!(
                    invocation = %inv.id,
                    "Command [{}] executed for [{}] in [{}]",
                    registered.key,
                    user,
                    inv.origin_channel.origin_label()
                );
                Ok(())
            }
            Err(e) => {
                let reason = format!("{e:#}");
                error!(
                    invocation = %inv.id,
                    command = %registered.key,
                    user = %user,
                    reason = %reason,
                    "Command failed"
                );
                let apology = format!("Sorry, {user}... something went wrong -> [{reason}]!");
                if let Err(send_err) = ctx.reply(&apology).await {
                    error!(invocation = %inv.id, error = %send_err, "Failed to send failure notice");
                }
                Err(BridgeError::CommandExecution {
                    command: registered.key.clone(),
                    user: user.clone(),
                    reason,
                })
            }
        }
    }
}
