//! Config redaction: mask credentials before a snapshot is logged or printed.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::schema::BridgeConfig;

/// Keys whose string values are secrets (matched case-insensitively on the suffix).
static SENSITIVE_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(token|apikey|api_key|secret|password|credential)$")
        .expect("valid sensitive key pattern")
});

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEY.is_match(key)
}

/// Replace every sensitive string with its first four characters plus `***`.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

/// Serialize a snapshot with its credentials masked, for display.
pub fn redacted_snapshot(config: &BridgeConfig) -> Value {
    match serde_json::to_value(config) {
        Ok(value) => redact(&value),
        Err(_) => Value::Null,
    }
}

fn redact_string(s: &str, key: &str) -> Value {
    if !is_sensitive_key(key) || s.is_empty() {
        return Value::String(s.to_string());
    }
    let hint = if s.chars().count() > 8 {
        format!("{}***", s.chars().take(4).collect::<String>())
    } else {
        "***".to_string()
    };
    Value::String(hint)
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) => redact_string(s, key),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                result.insert(k.clone(), redact_recursive(v, k));
            }
            Value::Object(result)
        }
        other => other.clone(),
    }
}
