//! Data models for auth API payloads and persisted session values.
//!
//! Field names follow the API's camelCase JSON. Every identity field is
//! optional because the server returns partial objects, and unknown fields
//! are kept in `extra` so a profile round-trips what the server sent.

pub mod auth;
pub mod user;

pub use auth::{LoginResponse, RegisterResponse};
pub use user::{Role, StoredUserData, UserProfile};

use serde::{Deserialize, Deserializer};
use tracing::warn;

/// Accept ids sent either as JSON strings or numbers.
pub(crate) fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Text(s)) => Some(s),
        Some(RawId::Number(n)) => Some(n.to_string()),
        None => None,
    })
}

/// Accept a lifetime in seconds as an integer, a float or a numeric string.
///
/// Zero, negative and unreadable values mean no expiry. Fractional seconds
/// round up so a short lifetime never collapses to zero.
pub(crate) fn deserialize_opt_lifetime<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let secs = match &raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match secs {
        Some(secs) if secs.is_finite() && secs > 0.0 => Ok(Some(secs.ceil() as u64)),
        Some(secs) if secs == 0.0 => Ok(None),
        _ => {
            warn!(value = %raw, "Ignoring unusable token lifetime");
            Ok(None)
        }
    }
}

/// Treat empty strings the way the web client treated falsy values.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
