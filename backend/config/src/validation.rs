//! Config validation: semantic checks serde cannot express.

use crate::schema::BridgeConfig;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// A config validation finding with field path and message.
#[derive(Debug, Clone, Error)]
#[error("config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// Errors and warnings found in one pass.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

pub fn validate(config: &BridgeConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_transport(config, &mut report);
    validate_completion(config, &mut report);
    validate_directives(config, &mut report);
    report
}

fn validate_transport(config: &BridgeConfig, report: &mut ValidationReport) {
    if config.credential.trim().is_empty() {
        report.error("DiscordToken", "Discord token is required");
    }
    if config.command_prefix.is_whitespace() {
        report.error("DiscordPrefix", "Command prefix cannot be whitespace");
    }
}

fn validate_completion(config: &BridgeConfig, report: &mut ValidationReport) {
    if config.completion_api_key.trim().is_empty() {
        report.warn("ChatGptApiKey", "No completion API key; translation commands will fail");
    }
    if config.completion_model.trim().is_empty() {
        report.error("ChatGptModel", "Model name cannot be empty");
    }
    if !config.completion_endpoint.starts_with("http://")
        && !config.completion_endpoint.starts_with("https://")
    {
        report.error("ChatGptEndpoint", "Endpoint must be an http(s) URL");
    }
}

fn validate_directives(config: &BridgeConfig, report: &mut ValidationReport) {
    let mut seen = HashSet::new();
    for (i, directive) in config.directives.iter().enumerate() {
        let path = format!("Directives[{i}]");
        let key = directive.command.trim().to_lowercase();
        if key.is_empty() {
            report.error(format!("{path}.Command"), "Directive command cannot be empty");
            continue;
        }
        if !seen.insert(key) {
            report.warn(
                path,
                format!(
                    "Duplicate directive for '{}'; the first entry wins",
                    directive.command
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> BridgeConfig {
        BridgeConfig::new("token", '!')
            .with_completion_api_key("sk")
            .with_directive("tlap", "Speak like a pirate.")
    }

    #[test]
    fn complete_config_is_valid() {
        let report = validate(&valid());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn empty_token_is_error() {
        let mut cfg = valid();
        cfg.credential = "  ".into();
        let report = validate(&cfg);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "DiscordToken");
    }

    #[test]
    fn whitespace_prefix_is_error() {
        let mut cfg = valid();
        cfg.command_prefix = ' ';
        assert!(!validate(&cfg).is_valid());
    }

    #[test]
    fn missing_api_key_is_warning_only() {
        let mut cfg = valid();
        cfg.completion_api_key.clear();
        let report = validate(&cfg);
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].path, "ChatGptApiKey");
    }

    #[test]
    fn duplicate_directive_warns() {
        let cfg = valid().with_directive("TLAP", "again");
        let report = validate(&cfg);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].path, "Directives[1]");
    }

    #[test]
    fn empty_directive_command_is_error() {
        let cfg = valid().with_directive("", "orphan");
        let report = validate(&cfg);
        assert_eq!(report.errors[0].path, "Directives[1].Command");
        assert!(report.to_string().contains("Directive command cannot be empty"));
    }
}
