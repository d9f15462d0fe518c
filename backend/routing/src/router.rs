//! Decides whether an inbound message addresses the bot and extracts the
//! command invocation.

use tracing::{debug, info};

use chatbridge_commands::CommandInvocation;
use chatbridge_core::{BotIdentity, ChannelKind, InboundMessage, SenderKind};

/// How a message addressed the bot, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// Content starts with an @-mention of the bot.
    Mention,
    /// Content starts with the configured prefix character.
    Prefix,
    /// One-to-one channel; no prefix needed.
    DirectChannel,
}

#[derive(Debug, Clone)]
pub struct MessageRouter {
    prefix: char,
    identity: BotIdentity,
}

impl MessageRouter {
    pub fn new(prefix: char, identity: BotIdentity) -> Self {
        Self { prefix, identity }
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    /// Extract the invocation from `message`, or `None` if it is not meant for the bot.
    pub fn route(&self, message: &InboundMessage) -> Option<CommandInvocation> {
        info!(
            "Received message from {}: {}",
            message.author.name, message.content
        );

        if message.author.kind != SenderKind::User || message.author.id == self.identity.user_id {
            debug!(author = %message.author.id, kind = ?message.author.kind, "Ignoring non-user message");
            return None;
        }

        let (addressing, offset) = self.addressing(message)?;
        let rest = message.content[offset..].trim_start();
        let (command_name, remainder) = match rest.split_once(char::is_whitespace) {
            Some((name, remainder)) => (name, remainder.trim()),
            None => (rest, ""),
        };
        if command_name.is_empty() {
            debug!(?addressing, "Addressed message has no command name");
            return None;
        }

        debug!(?addressing, command = command_name, "Routed message");
        Some(CommandInvocation::new(
            command_name,
            remainder,
            message.channel.clone(),
            message.author.clone(),
        ))
    }

    /// The addressing mode that matched and the byte offset where the command starts.
    pub fn addressing(&self, message: &InboundMessage) -> Option<(Addressing, usize)> {
        let content = message.content.as_str();
        if let Some(offset) = mention_prefix_len(content, &self.identity.user_id) {
            return Some((Addressing::Mention, offset));
        }
        if content.starts_with(self.prefix) {
            return Some((Addressing::Prefix, self.prefix.len_utf8()));
        }
        if message.channel.kind == ChannelKind::Direct {
            return Some((Addressing::DirectChannel, 0));
        }
        None
    }
}

/// Length of a leading `<@id> ` or `<@!id> ` mention of `user_id`, including
/// the single space that must follow it.
fn mention_prefix_len(content: &str, user_id: &str) -> Option<usize> {
    let inner_start = content.strip_prefix("<@")?;
    let end = inner_start.find('>')?;
    let inner = &inner_start[..end];
    let id = inner.strip_prefix('!').unwrap_or(inner);
    if id != user_id {
        return None;
    }
    // "<@" + inner + ">"
    let close = 2 + end + 1;
    if content[close..].starts_with(' ') {
        Some(close + 1)
    } else {
        None
    }
}
