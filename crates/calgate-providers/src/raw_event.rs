//! Events as the provider reports them.
//!
//! [`RawEvent`] mirrors the subset of a Google Calendar event resource this
//! service reads. It is consumed read-only and mapped to
//! [`SerializedEvent`] by [`RawEvent::to_serialized`].

use calgate_core::{EventStart, SerializedEvent, TimeParseError};
use serde::{Deserialize, Serialize};

/// The start (or end) field of a provider event.
///
/// Exactly one of `date_time` or `date` is normally set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventTime {
    /// RFC 3339 instant for timed events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// `YYYY-MM-DD` for all-day events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// IANA timezone the event was created in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl RawEventTime {
    /// A timed start.
    pub fn date_time(value: impl Into<String>) -> Self {
        Self {
            date_time: Some(value.into()),
            ..Self::default()
        }
    }

    /// An all-day start.
    pub fn date(value: impl Into<String>) -> Self {
        Self {
            date: Some(value.into()),
            ..Self::default()
        }
    }
}

/// A single event from the provider's event listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Provider event identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Event title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// `confirmed`, `tentative` or `cancelled`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// When the event starts.
    #[serde(default)]
    pub start: RawEventTime,
}

impl RawEvent {
    /// Creates an event with the given start and title.
    pub fn new(start: RawEventTime, summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            start,
            ..Self::default()
        }
    }

    /// Builder method to set the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder method to set the status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Returns true if the provider marked the event as cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }

    /// Parses the start of this event, preferring `dateTime` over `date`.
    pub fn parse_start(&self) -> Result<EventStart, TimeParseError> {
        EventStart::from_provider(self.start.date_time.as_deref(), self.start.date.as_deref())
    }

    /// Maps the event to the `{start, summary}` output shape.
    pub fn to_serialized(&self) -> Result<SerializedEvent, TimeParseError> {
        Ok(SerializedEvent::new(
            self.parse_start()?,
            self.summary.clone().unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timed_event() {
        let json = r#"{
            "id": "event1",
            "summary": "Test Meeting",
            "start": { "dateTime": "2024-05-01T10:00:00Z" },
            "end": { "dateTime": "2024-05-01T11:00:00Z" },
            "status": "confirmed"
        }"#;

        let event: RawEvent = serde_json::from_str(json).unwrap();
        let serialized = event.to_serialized().unwrap();
        assert_eq!(serialized.start.to_string(), "2024-05-01T10:00:00Z");
        assert_eq!(serialized.summary, "Test Meeting");
    }

    #[test]
    fn parse_all_day_event() {
        let json = r#"{
            "id": "event2",
            "summary": "All Day Event",
            "start": { "date": "2024-05-02" },
            "end": { "date": "2024-05-03" }
        }"#;

        let event: RawEvent = serde_json::from_str(json).unwrap();
        assert!(event.start.date_time.is_none());
        let serialized = event.to_serialized().unwrap();
        assert_eq!(serialized.start.to_string(), "2024-05-02");
    }

    #[test]
    fn missing_summary_becomes_empty() {
        let event = RawEvent {
            start: RawEventTime::date("2024-05-02"),
            ..RawEvent::default()
        };
        assert_eq!(event.to_serialized().unwrap().summary, "");
    }

    #[test]
    fn missing_start_is_an_error() {
        let event: RawEvent = serde_json::from_str(r#"{"id": "x", "summary": "No time"}"#).unwrap();
        assert_eq!(event.to_serialized(), Err(TimeParseError::Missing));
    }

    #[test]
    fn cancelled_status() {
        let event = RawEvent::new(RawEventTime::date("2024-05-02"), "Gone").with_status("cancelled");
        assert!(event.is_cancelled());
        assert!(!RawEvent::new(RawEventTime::date("2024-05-02"), "Here").is_cancelled());
    }
}
