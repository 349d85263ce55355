//! Lenient deserializers for upstream records.
//!
//! Upstream systems are inconsistent about scalar types: response codes show
//! up as `200` or `"200"`, criticality as `true`, `1` or `"Y"`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserializes any scalar into `Option<String>`. Numbers and booleans are
/// stringified; `null` becomes `None`.
pub fn opt_string_lenient<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_string))
}

/// Deserializes a truthy scalar into `bool`. Missing or `null` is `false`.
pub fn bool_lenient<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().is_some_and(is_truthy))
}

/// Converts a JSON scalar to its string form.
pub fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_some_and(|v| v != 0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "t" | "yes" | "y" | "1"
        ),
        _ => false,
    }
}
