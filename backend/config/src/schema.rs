//! Configuration snapshot schema.
//!
//! Field names follow the on-disk JSON (`DiscordToken`, `DiscordPrefix`, ...);
//! lower camel-case aliases are accepted as well.

use serde::{Deserialize, Serialize};

pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_COMPLETION_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// An immutable configuration snapshot. Reloads replace it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Chat transport auth token.
    #[serde(rename = "DiscordToken", alias = "credential")]
    pub credential: String,

    /// Prefix recognized in non-DM channels.
    #[serde(rename = "DiscordPrefix", alias = "commandPrefix")]
    pub command_prefix: char,

    /// Bearer credential for the completion service.
    #[serde(rename = "ChatGptApiKey", alias = "completionApiKey", default)]
    pub completion_api_key: String,

    /// Per-command system prompts, in declaration order.
    #[serde(rename = "Directives", alias = "directives", default)]
    pub directives: Vec<Directive>,

    #[serde(rename = "ChatGptModel", alias = "completionModel", default = "default_model")]
    pub completion_model: String,

    #[serde(
        rename = "ChatGptEndpoint",
        alias = "completionEndpoint",
        default = "default_endpoint"
    )]
    pub completion_endpoint: String,
}

fn default_model() -> String {
    DEFAULT_COMPLETION_MODEL.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_COMPLETION_ENDPOINT.to_string()
}

/// A system-prompt fragment keyed by command name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    #[serde(rename = "Command", alias = "command")]
    pub command: String,
    #[serde(rename = "Text", alias = "text")]
    pub text: String,
}

impl Directive {
    pub fn new(command: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            text: text.into(),
        }
    }
}

impl BridgeConfig {
    pub fn new(credential: impl Into<String>, command_prefix: char) -> Self {
        Self {
            credential: credential.into(),
            command_prefix,
            completion_api_key: String::new(),
            directives: Vec::new(),
            completion_model: default_model(),
            completion_endpoint: default_endpoint(),
        }
    }

    pub fn with_directive(mut self, command: impl Into<String>, text: impl Into<String>) -> Self {
        self.directives.push(Directive::new(command, text));
        self
    }

    pub fn with_completion_api_key(mut self, key: impl Into<String>) -> Self {
        self.completion_api_key = key.into();
        self
    }

    /// Directive text for `command`, matched case-insensitively.
    ///
    /// The first entry in declaration order wins; an unknown command yields `""`.
    pub fn directive(&self, command: &str) -> &str {
        self.directives
            .iter()
            .find(|d| d.command.eq_ignore_ascii_case(command))
            .map(|d| d.text.as_str())
            .unwrap_or("")
    }
}
