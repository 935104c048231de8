//! Lenient field decoders.
//!
//! Upstream payloads come from a loosely typed producer: counts arrive as
//! numbers, numeric strings or subscriber lists, timestamps as strings or
//! epoch numbers. These helpers turn any JSON value into an `Option` of the
//! wanted shape and never fail, so one odd field cannot reject a whole event.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Read a value as display text. Numbers and booleans are stringified.
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read a value as a non-negative count.
///
/// Arrays count as their length, which is how the broker reports topics
/// (a list of subscriber ids per topic).
pub fn count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_i64().map(|v| v.max(0) as u64))
            .or_else(|| n.as_f64().map(|v| if v > 0.0 { v as u64 } else { 0 })),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Array(items) => Some(items.len() as u64),
        _ => None,
    }
}

/// Read a value as a boolean. Accepts `true`/`false`, 0/1 and their string forms.
pub fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Read a value as a list of strings, skipping entries that are not text.
pub fn text_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(text).collect()),
        _ => None,
    }
}

pub fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text(&value))
}

pub fn opt_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(count(&value))
}

pub fn opt_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(flag(&value))
}

pub fn opt_text_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text_list(&value))
}

pub fn text_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_text(deserializer)?.unwrap_or_default())
}

/// Decode any count-like value into a narrower integer, falling back to zero
/// when it is missing, malformed or out of range.
pub fn count_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64> + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(count(&value)
        .and_then(|c| T::try_from(c).ok())
        .unwrap_or_default())
}

pub fn flag_or_default<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_flag(deserializer)?.unwrap_or_default())
}
