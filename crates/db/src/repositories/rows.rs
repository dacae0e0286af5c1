use canvass_core::chrono::{DateTime, Utc};
use serde_json::Value;

use super::RepositoryError;

pub(crate) fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|timestamp| parse_timestamp(column, timestamp)).transpose()
}

pub(crate) fn parse_json(column: &str, value: &str) -> Result<Value, RepositoryError> {
    serde_json::from_str(value)
        .map_err(|error| RepositoryError::Decode(format!("invalid json in `{column}`: {error}")))
}

pub(crate) fn parse_string_list(column: &str, value: &str) -> Result<Vec<String>, RepositoryError> {
    serde_json::from_str(value).map_err(|error| {
        RepositoryError::Decode(format!("invalid string list in `{column}`: {error}"))
    })
}

pub(crate) fn encode_string_list(values: &[String]) -> Result<String, RepositoryError> {
    serde_json::to_string(values)
        .map_err(|error| RepositoryError::Decode(format!("could not encode string list: {error}")))
}

/// Decodes an optional enum column through the type's `parse`.
pub(crate) fn parse_optional_enum<T>(
    column: &str,
    value: Option<String>,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>, RepositoryError> {
    value
        .map(|raw| {
            parse(&raw).ok_or_else(|| {
                RepositoryError::Decode(format!("unknown value in `{column}`: `{raw}`"))
            })
        })
        .transpose()
}
