//! Statically declared command set, rebuilt identically on every restart.

use crate::types::{CommandCategory, CommandDef};

fn def(key: &str, aliases: &[&str], summary: &str, usage: &str, category: CommandCategory) -> CommandDef {
    CommandDef {
        key: key.to_string(),
        aliases: aliases.iter().map(|s| s.to_string()).collect(),
        summary: summary.to_string(),
        usage: usage.to_string(),
        category,
    }
}

/// The built-in commands.
pub fn builtin_commands() -> Vec<CommandDef> {
    vec![
        def(
            "help",
            &["about", "abouttlap"],
            "Explains what this bot does and lists its commands.",
            "",
            CommandCategory::Info,
        ),
        def(
            "tlap",
            &[],
            "Translates text to Pirate Lingo.",
            "<message>",
            CommandCategory::Translation,
        ),
        def(
            "zapp",
            &[],
            "Translates text to speak like Zapp Brannigan.",
            "<message>",
            CommandCategory::Translation,
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct CommandRegistry {
    commands: Vec<CommandDef>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self { commands: builtin_commands() }
    }

    pub fn all(&self) -> &[CommandDef] {
        &self.commands
    }

    /// Find a command by key or alias, ignoring case.
    pub fn find(&self, name: &str) -> Option<&CommandDef> {
        self.commands.iter().find(|c| c.answers_to(name))
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
