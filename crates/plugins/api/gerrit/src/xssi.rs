//! Response unwrapping for Gerrit's anti-XSSI prefix.
//!
//! Gerrit prepends `)]}'` to every JSON response so that a browser cannot
//! execute the payload as a script. The prefix is present on error bodies
//! too, so both paths go through the same unwrapping.

use gerrit_core::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Magic prefix preceding every JSON payload.
pub const XSSI_PREFIX: &str = ")]}'";

/// Strip the prefix if present; otherwise return the body unchanged.
pub fn strip_prefix(body: &str) -> &str {
    body.strip_prefix(XSSI_PREFIX).unwrap_or(body)
}

/// Unwrap and decode a JSON body.
///
/// Invalid JSON after unwrapping surfaces as a plain serialization error.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    Ok(serde_json::from_str(strip_prefix(body))?)
}

/// Extract a human-readable message from an error body.
///
/// Prefers a JSON `message` field, then a bare JSON string, then the raw
/// (unwrapped, trimmed) text.
pub fn error_message(body: &str) -> String {
    let text = strip_prefix(body).trim();

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => match map.get("message") {
            Some(Value::String(message)) => message.trim().to_string(),
            _ => text.to_string(),
        },
        Ok(Value::String(message)) => message.trim().to_string(),
        _ => text.to_string(),
    }
}
