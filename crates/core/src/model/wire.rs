//! Serde helpers shared by backend-facing records.

use serde::{Deserialize, Deserializer};

/// Treats `null`, missing and blank strings alike.
///
/// The backend stores optional media/notes as `""` when a form field was left
/// empty, so the domain sees `None` in all three cases.
pub(crate) fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()))
}

/// Accepts `null` where a string is expected and yields an empty string.
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn default_true() -> bool {
    true
}
