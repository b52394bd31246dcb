//! Redaction of secrets embedded in diagnostics.

use serde::Serialize;
use serde_json::Value;

/// Key fragments whose values are never echoed into error messages.
const SENSITIVE_KEYS: [&str; 5] = ["token", "password", "secret", "authorization", "api_key"];

/// Redact sensitive fields from a JSON value.
#[must_use]
pub fn redact_sensitive(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| {
                    let lower = key.to_lowercase();
                    if SENSITIVE_KEYS.iter().any(|s| lower.contains(s)) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_sensitive(val))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive).collect()),
        other => other.clone(),
    }
}

/// Serialize `value` for an error message, with secrets redacted.
pub(crate) fn render<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .map(|value| redact_sensitive(&value).to_string())
        .unwrap_or_else(|err| format!("<unserializable: {err}>"))
}
