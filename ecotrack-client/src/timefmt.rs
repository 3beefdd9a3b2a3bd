//! Timestamp and date handling for seed files and reports.
//!
//! Seed files carry naive ISO-8601 timestamps (`2024-01-01T00:00:00`), which
//! are interpreted as UTC. RFC 3339 values with an explicit offset are also
//! accepted.

use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    Date, OffsetDateTime, PrimitiveDateTime,
};

const NAIVE_TS: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const NAIVE_TS_FRACTION: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
const DAY: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn parse_timestamp(s: &str) -> Result<OffsetDateTime, time::error::Parse> {
    let s = s.trim();
    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(ts);
    }
    PrimitiveDateTime::parse(s, NAIVE_TS)
        .or_else(|_| PrimitiveDateTime::parse(s, NAIVE_TS_FRACTION))
        .map(PrimitiveDateTime::assume_utc)
}

/// Formats as a naive UTC timestamp, the same shape the seed generator writes.
pub fn format_timestamp(ts: OffsetDateTime) -> String {
    let utc = ts.to_offset(time::UtcOffset::UTC);
    utc.format(NAIVE_TS).unwrap_or_else(|_| utc.to_string())
}

pub fn parse_date(s: &str) -> Result<Date, time::error::Parse> {
    Date::parse(s.trim(), DAY)
}

pub fn format_date(date: Date) -> String {
    date.format(DAY).unwrap_or_else(|_| date.to_string())
}

/// Start of `date` in UTC.
pub fn day_start(date: Date) -> OffsetDateTime {
    date.midnight().assume_utc()
}

/// Serde adapter for timestamps written as naive ISO-8601 strings.
pub mod iso {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(ts: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(*ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_timestamp(&s).map_err(|e| D::Error::custom(format!("invalid timestamp '{s}': {e}")))
    }
}

/// Serde adapter for calendar dates written as `YYYY-MM-DD`.
pub mod day {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_date(&s).map_err(|e| D::Error::custom(format!("invalid date '{s}': {e}")))
    }
}
