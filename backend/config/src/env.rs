//! `${VAR_NAME}` substitution for config string values.
//!
//! Only uppercase `[A-Z_][A-Z0-9_]*` names are matched. `$${VAR}` escapes to a
//! literal `${VAR}`. Directive prompts are free text and are never substituted.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var pattern"));

#[derive(Debug, thiserror::Error)]
#[error("missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in every string leaf of `value`.
pub fn resolve_env_vars(value: &Value) -> Result<Value, MissingEnvVarError> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Same as [`resolve_env_vars`] with an explicit environment.
pub fn resolve_env_vars_with(
    value: &Value,
    env: &HashMap<String, String>,
) -> Result<Value, MissingEnvVarError> {
    substitute_value(value, env, "")
}

/// Same as [`resolve_env_vars`], leaving the top-level fields named in
/// `verbatim` untouched.
pub fn resolve_env_vars_except(
    value: &Value,
    verbatim: &[&str],
) -> Result<Value, MissingEnvVarError> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let Value::Object(map) = value else {
        return substitute_value(value, &env, "");
    };
    let mut result = serde_json::Map::new();
    for (k, v) in map {
        let resolved = if verbatim.contains(&k.as_str()) {
            v.clone()
        } else {
            substitute_value(v, &env, k)?
        };
        result.insert(k.clone(), resolved);
    }
    Ok(Value::Object(result))
}

fn substitute_value(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => arr
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let var_name = &caps[1];
        if caps[0].starts_with("$$") {
            return format!("${{{var_name}}}");
        }
        match env.get(var_name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: var_name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    match missing {
        Some(err) => Err(err),
        None => Ok(substituted.into_owned()),
    }
}
