//! Redaction of sensitive parameters before they reach any storage.

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Replacement written in place of a sensitive value
pub const REDACTED: &str = "[REDACTED]";

/// Parameter names (compared lowercase) whose values are never stored
pub static SENSITIVE_PARAMETERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "password",
        "pwd",
        "pass",
        "secret",
        "token",
        "key",
        "auth",
        "credential",
        "api_key",
        "apikey",
        "access_token",
        "refresh_token",
        "session_token",
        "private_key",
        "public_key",
        "cert",
        "certificate",
        "signature",
        "hash",
        "salt",
        "oauth",
        "bearer",
        "authorization",
    ]
    .into_iter()
    .collect()
});

pub fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_PARAMETERS.contains(key.to_lowercase().as_str())
}

/// Deep copy of `parameters` with every sensitive key redacted
pub fn sanitize_parameters(parameters: &Map<String, Value>) -> Map<String, Value> {
    parameters
        .iter()
        .map(|(key, value)| {
            let clean = if is_sensitive_key(key) {
                Value::String(REDACTED.to_string())
            } else {
                sanitize_value(value)
            };
            (key.clone(), clean)
        })
        .collect()
}

/// Recurse through objects and arrays; leaves pass through untouched
pub fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sanitize_parameters(map)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        leaf => leaf.clone(),
    }
}
