//! The event shape handed back to HTTP callers.

use serde::{Deserialize, Serialize};

use crate::time::EventStart;

/// A calendar event reduced to what the `/events` endpoint returns.
///
/// Serialises as `{"start": "...", "summary": "..."}` where `start` is the
/// provider's `dateTime` or all-day `date` string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// When the event starts.
    pub start: EventStart,
    /// The event title. Empty when the provider sent none.
    pub summary: String,
}

impl SerializedEvent {
    /// Creates a new serialised event.
    pub fn new(start: EventStart, summary: impl Into<String>) -> Self {
        Self {
            start,
            summary: summary.into(),
        }
    }
}
