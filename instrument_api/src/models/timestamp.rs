//! Serde helpers for the server-assigned `created_at` / `updated_at` fields.
//!
//! The backend writes SQLite `CURRENT_TIMESTAMP` values, which come back without
//! an offset (`2024-05-01 12:00:00` or `2024-05-01T12:00:00`). Anything with an
//! explicit offset is parsed as RFC-3339 and converted; naive values are taken
//! to be UTC. Serialization always emits RFC-3339 with a `Z` suffix.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a server timestamp into UTC.
///
/// Example:
/// - "2024-03-10T09:30:00-05:00" -> 2024-03-10T14:30:00Z
/// - "2024-03-10 09:30:00"       -> 2024-03-10T09:30:00Z
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let s = s.trim();
    match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(rfc_err) => NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|naive| naive.and_utc())
            .ok_or(rfc_err),
    }
}

pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(|e| D::Error::custom(format!("bad timestamp `{raw}`: {e}")))
}
