//! Lenient decoders for hand-edited JSON documents.

use chrono::{DateTime, NaiveDate};
use serde::de::Error;
use serde::{Deserialize, Deserializer};

/// Decodes an optional calendar day written either as `YYYY-MM-DD` or as a
/// full RFC 3339 timestamp. Empty strings decode to `None`.
pub(crate) fn optional_day<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_day(trimmed).map(Some).map_err(D::Error::custom)
}

pub(crate) fn parse_day(value: &str) -> Result<NaiveDate, String> {
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(day);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.date_naive())
        .map_err(|err| format!("invalid date `{value}`: {err}"))
}
