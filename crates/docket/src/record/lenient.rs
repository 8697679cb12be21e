//! Field-level deserialization that never fails a whole record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserializes a field, substituting `T::default()` when the payload has
/// the wrong shape.
///
/// Use together with `#[serde(default)]` so absent fields also fall back.
pub fn or_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(from_value_or_default(value))
}

/// Converts an already-parsed JSON value, logging and defaulting on mismatch.
pub fn from_value_or_default<T>(value: Value) -> T
where
    T: DeserializeOwned + Default,
{
    if value.is_null() {
        return T::default();
    }

    match serde_json::from_value(value) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(
                error = %e,
                target_type = std::any::type_name::<T>(),
                "Malformed field replaced with empty value"
            );
            T::default()
        }
    }
}
