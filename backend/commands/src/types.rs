//! Command definitions and parsed invocations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chatbridge_core::{Author, ChannelRef};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandCategory {
    /// Usage and bot information.
    Info,
    /// Passes the remainder through the completion service.
    Translation,
}

/// A statically declared command entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDef {
    /// Unique key, also the directive key for translation commands.
    pub key: String,
    /// Extra names the command answers to.
    pub aliases: Vec<String>,
    pub summary: String,
    /// Argument hint shown by `help` (e.g. "<message>").
    pub usage: String,
    pub category: CommandCategory,
}

impl CommandDef {
    /// Key followed by aliases.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.key.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Whether `name` matches the key or an alias, ignoring case.
    pub fn answers_to(&self, name: &str) -> bool {
        self.names().any(|n| n.eq_ignore_ascii_case(name))
    }
}

/// A command extracted from one inbound message. Lives for one dispatch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Correlates the log lines of one dispatch cycle.
    pub id: Uuid,
    pub command_name: String,
    /// Everything after the command name, trimmed.
    pub remainder: String,
    pub origin_channel: ChannelRef,
    pub origin_user: Author,
}

impl CommandInvocation {
    pub fn new(
        command_name: impl Into<String>,
        remainder: impl Into<String>,
        origin_channel: ChannelRef,
        origin_user: Author,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            command_name: command_name.into(),
            remainder: remainder.into(),
            origin_channel,
            origin_user,
        }
    }
}
