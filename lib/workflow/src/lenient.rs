//! Lenient field readers for untrusted workflow documents.
//!
//! Drafts come from an AI collaborator, so a field of the wrong JSON type is
//! read as absent instead of failing the whole document. Repair fills the
//! gap and validation reports it.

use crate::node::Position;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeSet;

/// Reads a non-blank string. Numbers are accepted and rendered as text.
pub(crate) fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<JsonValue>::deserialize(deserializer)? {
        Some(JsonValue::String(s)) if !s.trim().is_empty() => Some(s),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Reads a positive integer version. `2`, `2.0` and `"2"` are accepted;
/// `4.2`, `0` and non-numbers are not.
pub(crate) fn version<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<JsonValue>::deserialize(deserializer)? {
        Some(JsonValue::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 1.0 && *f <= f64::from(u32::MAX))
                .map(|f| f as u64)
        }),
        Some(JsonValue::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(raw.filter(|v| *v >= 1).and_then(|v| u32::try_from(v).ok()))
}

pub(crate) fn boolean<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<JsonValue>::deserialize(deserializer)? {
        Some(JsonValue::Bool(b)) => Some(b),
        _ => None,
    })
}

/// Reads `[x, y]` or `{"x": .., "y": ..}`.
pub(crate) fn position<'de, D>(deserializer: D) -> Result<Option<Position>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<JsonValue>::deserialize(deserializer)? {
        Some(JsonValue::Array(items)) if items.len() == 2 => {
            match (items[0].as_f64(), items[1].as_f64()) {
                (Some(x), Some(y)) => Some(Position::new(x, y)),
                _ => None,
            }
        }
        Some(JsonValue::Object(map)) => {
            match (
                map.get("x").and_then(JsonValue::as_f64),
                map.get("y").and_then(JsonValue::as_f64),
            ) {
                (Some(x), Some(y)) => Some(Position::new(x, y)),
                _ => None,
            }
        }
        _ => None,
    })
}

pub(crate) fn object<'de, D>(deserializer: D) -> Result<Option<Map<String, JsonValue>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<JsonValue>::deserialize(deserializer)? {
        Some(JsonValue::Object(map)) => Some(map),
        _ => None,
    })
}

/// Reads tags given either as strings or as `{"name": ..}` objects.
pub(crate) fn tags<'de, D>(deserializer: D) -> Result<Option<BTreeSet<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(JsonValue::Array(items)) = Option::<JsonValue>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let tags = items
        .into_iter()
        .filter_map(|item| match item {
            JsonValue::String(s) => Some(s),
            JsonValue::Object(mut map) => match map.remove("name") {
                Some(JsonValue::String(s)) => Some(s),
                _ => None,
            },
            _ => None,
        })
        .filter(|s| !s.trim().is_empty())
        .collect();
    Ok(Some(tags))
}

/// Reads any record type, treating a value that does not fit as absent.
pub(crate) fn or_absent<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<JsonValue>::deserialize(deserializer)?
        .and_then(|value| serde_json::from_value(value).ok()))
}
