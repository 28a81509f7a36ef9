//! Start times of calendar events.
//!
//! Providers report an event start either as a timed `dateTime` (RFC 3339)
//! or as an all-day `date`. [`EventStart`] keeps the provider's original
//! string so the JSON we hand back matches what the provider sent.
//!
//! Equality is structural: two timed starts naming the same instant with
//! different offsets are not equal. Use [`EventStart::to_utc_datetime`] to
//! compare instants.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error returned when a provider start value cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    /// Neither `dateTime` nor `date` was present.
    #[error("event has no start time")]
    Missing,

    /// The `dateTime` value is not RFC 3339.
    #[error("invalid start dateTime {value:?}: {reason}")]
    InvalidDateTime { value: String, reason: String },

    /// The `date` value is not `YYYY-MM-DD`.
    #[error("invalid start date {value:?}: {reason}")]
    InvalidDate { value: String, reason: String },
}

/// The start of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventStart {
    /// A timed event. `raw` is the provider string, `instant` its UTC value.
    DateTime { raw: String, instant: DateTime<Utc> },
    /// An all-day event.
    AllDay(NaiveDate),
}

impl EventStart {
    /// Builds a start from the provider's `dateTime` and `date` fields.
    ///
    /// A timed `dateTime` wins over an all-day `date` when both are present.
    pub fn from_provider(date_time: Option<&str>, date: Option<&str>) -> Result<Self, TimeParseError> {
        match (date_time, date) {
            (Some(dt), _) => Self::parse_date_time(dt),
            (None, Some(d)) => Self::parse_date(d),
            (None, None) => Err(TimeParseError::Missing),
        }
    }

    fn parse_date_time(value: &str) -> Result<Self, TimeParseError> {
        let parsed = DateTime::parse_from_rfc3339(value).map_err(|e| {
            TimeParseError::InvalidDateTime {
                value: value.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self::DateTime {
            raw: value.to_string(),
            instant: parsed.with_timezone(&Utc),
        })
    }

    fn parse_date(value: &str) -> Result<Self, TimeParseError> {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Self::AllDay)
            .map_err(|e| TimeParseError::InvalidDate {
                value: value.to_string(),
                reason: e.to_string(),
            })
    }

    /// Returns `true` for all-day events.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Converts to a UTC instant.
    ///
    /// All-day events map to midnight UTC, which is only an approximation
    /// for calendars in other time zones.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime { instant, .. } => *instant,
            Self::AllDay(date) => date.and_time(NaiveTime::default()).and_utc(),
        }
    }
}

impl fmt::Display for EventStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DateTime { raw, .. } => f.write_str(raw),
            Self::AllDay(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl FromStr for EventStart {
    type Err = TimeParseError;

    /// Parses a serialised start: RFC 3339 when it carries a time, otherwise
    /// a plain date.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('T') {
            Self::parse_date_time(s)
        } else {
            Self::parse_date(s)
        }
    }
}

impl Serialize for EventStart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventStart {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn date_time_preferred_over_date() {
        let start =
            EventStart::from_provider(Some("2024-05-01T10:00:00Z"), Some("2024-05-01")).unwrap();
        assert!(!start.is_all_day());
        assert_eq!(start.to_string(), "2024-05-01T10:00:00Z");
    }

    #[test]
    fn all_day_keeps_plain_date() {
        let start = EventStart::from_provider(None, Some("2024-05-02")).unwrap();
        assert!(start.is_all_day());
        assert_eq!(start.to_string(), "2024-05-02");
    }

    #[test]
    fn raw_offset_is_preserved() {
        let start = EventStart::from_provider(Some("2024-05-01T12:00:00+02:00"), None).unwrap();
        assert_eq!(start.to_string(), "2024-05-01T12:00:00+02:00");
        assert_eq!(
            start.to_utc_datetime(),
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn missing_and_invalid_starts() {
        assert_eq!(EventStart::from_provider(None, None), Err(TimeParseError::Missing));
        assert!(matches!(
            EventStart::from_provider(Some("yesterday"), None),
            Err(TimeParseError::InvalidDateTime { .. })
        ));
        assert!(matches!(
            EventStart::from_provider(None, Some("2024-13-40")),
            Err(TimeParseError::InvalidDate { .. })
        ));
    }

    #[test]
    fn same_instant_with_other_offset_is_a_different_start() {
        let utc = EventStart::from_provider(Some("2024-05-01T10:00:00Z"), None).unwrap();
        let paris = EventStart::from_provider(Some("2024-05-01T12:00:00+02:00"), None).unwrap();

        assert_ne!(utc, paris);
        assert_eq!(utc.to_utc_datetime(), paris.to_utc_datetime());
        assert_eq!(utc, utc.to_string().parse().unwrap());
    }

    #[test]
    fn all_day_maps_to_midnight_utc() {
        let all_day = EventStart::from_provider(None, Some("2024-05-02")).unwrap();
        assert_eq!(
            all_day.to_utc_datetime(),
            Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn serde_uses_plain_strings() {
        let start: EventStart = serde_json::from_str("\"2024-05-02\"").unwrap();
        assert!(start.is_all_day());
        assert_eq!(serde_json::to_string(&start).unwrap(), "\"2024-05-02\"");

        let timed: EventStart = serde_json::from_str("\"2024-05-01T10:00:00Z\"").unwrap();
        assert_eq!(serde_json::to_string(&timed).unwrap(), "\"2024-05-01T10:00:00Z\"");
    }
}
