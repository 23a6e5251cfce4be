//! Lenient timestamps
//!
//! The services emit RFC 3339 instants, but some payloads (and fixtures) carry
//! plain dates or naive date-times. All of them decode into a UTC [`Timestamp`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timestamp: {0:?}")]
pub struct TimestampError(pub String);

/// A UTC instant decoded from any of the formats the backend uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn from_utc(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn as_utc(&self) -> DateTime<Utc> {
        self.0
    }

    /// Calendar date of the instant, in UTC.
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    /// Go's zero `time.Time` (`0001-01-01T00:00:00Z`) stands for "never".
    pub fn is_zero(&self) -> bool {
        self.0.year() <= 1
    }

    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(dt.with_timezone(&Utc)));
        }

        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(Self(naive.and_utc()));
            }
        }

        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Self(naive.and_utc()))
            .ok_or_else(|| TimestampError(raw.to_string()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// `deserialize_with` helper for optional timestamps.
///
/// Missing, `null`, empty and zero-time values all become `None`.
pub mod optional {
    use super::Timestamp;
    use serde::{de, Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Timestamp>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => {
                let ts: Timestamp = s.parse().map_err(de::Error::custom)?;
                Ok((!ts.is_zero()).then_some(ts))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let ts: Timestamp = "2024-06-01T10:00:00+02:00".parse().unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-06-01T08:00:00Z");
    }

    #[test]
    fn test_parse_plain_date() {
        let ts: Timestamp = "2024-01-01".parse().unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-01T00:00:00Z");
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_parse_naive_datetime() {
        let ts: Timestamp = "2024-01-01 09:30:00".parse().unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-01T09:30:00Z");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = "yesterday".parse::<Timestamp>().unwrap_err();
        assert_eq!(err, TimestampError("yesterday".to_string()));
    }

    #[test]
    fn test_zero_time_is_absent() {
        #[derive(Deserialize)]
        struct Stamped {
            #[serde(default, deserialize_with = "optional::deserialize")]
            at: Option<Timestamp>,
        }

        let stamped: Stamped = serde_json::from_str(r#"{"at":"0001-01-01T00:00:00Z"}"#).unwrap();
        assert!(stamped.at.is_none());

        let stamped: Stamped = serde_json::from_str(r#"{}"#).unwrap();
        assert!(stamped.at.is_none());

        let stamped: Stamped = serde_json::from_str(r#"{"at":"2024-03-02T12:00:00Z"}"#).unwrap();
        assert_eq!(stamped.at.unwrap().to_rfc3339(), "2024-03-02T12:00:00Z");
    }

    #[test]
    fn test_malformed_json_timestamp_fails() {
        let result = serde_json::from_str::<Timestamp>(r#""not-a-date""#);
        assert!(result.is_err());
    }
}
