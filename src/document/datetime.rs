//! Fixed-format UTC timestamps for date-valued document fields.
//!
//! Dates round-trip through exactly one textual encoding,
//! `YYYY-MM-DDTHH:mm:ss.sssZ` (millisecond precision, UTC), on both the
//! serialize and deserialize side. Using the same format string in both
//! directions is what keeps sub-second precision intact across a store
//! round-trip.
//!
//! ## Example
//!
//! ```
//! use chrono::{DateTime, Utc};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Appointment {
//!     #[serde(with = "documap::datetime")]
//!     starts_at: DateTime<Utc>,
//! }
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// The single wire format for date fields.
pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.format(FORMAT).to_string())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse(&text).map_err(serde::de::Error::custom)
}

/// Parse a timestamp in the fixed wire format.
pub fn parse(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, FORMAT).map(|naive| naive.and_utc())
}

/// Render a timestamp in the fixed wire format.
pub fn format(value: &DateTime<Utc>) -> String {
    value.format(FORMAT).to_string()
}

/// `Option<DateTime<Utc>>` variant for optional date fields.
pub mod option {
    use super::*;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => super::serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = Option::<String>::deserialize(deserializer)?;
        text.map(|text| super::parse(&text).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_with_millisecond_precision() {
        let value = Utc.with_ymd_and_hms(2024, 3, 9, 17, 30, 5).unwrap()
            + chrono::Duration::milliseconds(250);
        assert_eq!(format(&value), "2024-03-09T17:30:05.250Z");
    }

    #[test]
    fn round_trips_exactly() {
        let text = "2024-03-09T17:30:05.007Z";
        let parsed = parse(text).unwrap();
        assert_eq!(format(&parsed), text);
    }

    #[test]
    fn rejects_other_encodings() {
        assert!(parse("2024-03-09 17:30:05.007").is_err());
        assert!(parse("09/03/2024").is_err());
    }
}
