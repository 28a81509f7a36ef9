//! Event Query Facade.
//!
//! Turns a credential payload into the user's upcoming events: refresh the
//! access token if needed, list the primary calendar, reduce each event to
//! `{start, summary}`.

use calgate_core::{CredentialPayload, SerializedEvent};
use chrono::Utc;
use tracing::{debug, warn};

use crate::error::{CredentialError, CredentialResult};
use crate::manager::CredentialManager;
use crate::provider::EventQuery;
use crate::raw_event::RawEvent;

/// Upcoming events together with the credentials used to fetch them.
///
/// `credentials` differs from the input payload when a refresh happened and
/// should be written back to the session.
#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingEvents {
    pub credentials: CredentialPayload,
    pub events: Vec<SerializedEvent>,
}

/// Lists upcoming events on behalf of a session.
#[derive(Debug, Clone)]
pub struct EventFacade {
    manager: CredentialManager,
}

impl EventFacade {
    pub fn new(manager: CredentialManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &CredentialManager {
        &self.manager
    }

    /// Returns at most `limit` upcoming events in the order the provider
    /// listed them (by start time).
    ///
    /// Refresh failures are reported as the manager reports them. Any
    /// failure of the event listing itself is a
    /// [`CredentialError::ProviderQuery`]. Cancelled events and events
    /// without a usable start are skipped.
    pub async fn list_upcoming_events(
        &self,
        payload: CredentialPayload,
        limit: usize,
    ) -> CredentialResult<UpcomingEvents> {
        let credentials = self.manager.refresh_if_needed(payload).await?;

        if limit == 0 {
            return Ok(UpcomingEvents {
                credentials,
                events: Vec::new(),
            });
        }

        let query = EventQuery::upcoming(Utc::now(), limit);
        let provider = self.manager.provider();
        let raw = provider
            .list_events(&credentials.token, &query)
            .await
            .map_err(|e| {
                warn!(provider = provider.name(), error = %e, "event listing failed");
                CredentialError::ProviderQuery(e)
            })?;

        let received = raw.len();
        let events = to_serialized_events(raw, limit);
        debug!(received, returned = events.len(), "listed upcoming events");

        Ok(UpcomingEvents {
            credentials,
            events,
        })
    }
}

/// Maps provider events to the output shape and truncates to `limit`.
///
/// The provider order is kept as is. All-day dates have no time zone here,
/// so re-sorting them against timed events would misplace them.
pub fn to_serialized_events(raw: Vec<RawEvent>, limit: usize) -> Vec<SerializedEvent> {
    raw
        .into_iter()
        .filter_map(|event| {
            if event.is_cancelled() {
                debug!(id = ?event.id, "skipping cancelled event");
                return None;
            }
            match event.to_serialized() {
                Ok(serialized) => Some(serialized),
                Err(e) => {
                    warn!(id = ?event.id, error = %e, "skipping event with unusable start");
                    None
                }
            }
        })
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::config::{ClientConfig, OAuthCredentials};
    use crate::error::ProviderErrorCode;
    use crate::fake::FakeProvider;
    use crate::raw_event::RawEventTime;

    fn facade(provider: FakeProvider) -> (EventFacade, Arc<FakeProvider>) {
        let provider = Arc::new(provider);
        let config = ClientConfig::new(
            OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret"),
            "http://localhost:5000/callback",
        );
        (
            EventFacade::new(CredentialManager::new(config, provider.clone())),
            provider,
        )
    }

    fn payload(expired: bool, refresh_token: Option<&str>) -> CredentialPayload {
        let offset = if expired {
            -Duration::hours(1)
        } else {
            Duration::hours(1)
        };
        CredentialPayload {
            token: "access".to_string(),
            refresh_token: refresh_token.map(str::to_string),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            client_id: "test-client.apps.googleusercontent.com".to_string(),
            client_secret: "test-secret".to_string(),
            scopes: vec![ClientConfig::CALENDAR_SCOPE.to_string()],
            expiry: Some(Utc::now() + offset),
        }
    }

    fn sample_events() -> Vec<RawEvent> {
        vec![
            RawEvent::new(RawEventTime::date_time("2024-04-30T09:00:00+02:00"), "Early"),
            RawEvent::new(RawEventTime::date_time("2024-05-01T10:00:00Z"), "Standup"),
            RawEvent::new(RawEventTime::date("2024-05-02"), "Offsite"),
        ]
    }

    #[tokio::test]
    async fn zero_events_is_empty() {
        let (facade, provider) = facade(FakeProvider::new());
        let result = facade
            .list_upcoming_events(payload(false, None), 20)
            .await
            .unwrap();
        assert!(result.events.is_empty());
        assert_eq!(provider.list_calls(), 1);
    }

    #[tokio::test]
    async fn events_keep_provider_order_and_strings() {
        let (facade, provider) = facade(FakeProvider::new().with_events(sample_events()));
        let result = facade
            .list_upcoming_events(payload(false, None), 20)
            .await
            .unwrap();

        insta::assert_json_snapshot!(result.events, @r###"
        [
          {
            "start": "2024-04-30T09:00:00+02:00",
            "summary": "Early"
          },
          {
            "start": "2024-05-01T10:00:00Z",
            "summary": "Standup"
          },
          {
            "start": "2024-05-02",
            "summary": "Offsite"
          }
        ]
        "###);

        let query = provider.last_query().unwrap();
        assert_eq!(query.calendar_id, "primary");
        assert_eq!(query.max_results, 20);
        assert!(query.single_events);
    }

    #[tokio::test]
    async fn limit_truncates() {
        let (facade, _) = facade(FakeProvider::new().with_events(sample_events()));
        let result = facade
            .list_upcoming_events(payload(false, None), 2)
            .await
            .unwrap();
        assert_eq!(result.events.len(), 2);
    }

    #[tokio::test]
    async fn zero_limit_skips_provider() {
        let (facade, provider) = facade(FakeProvider::new().with_events(sample_events()));
        let result = facade
            .list_upcoming_events(payload(false, None), 0)
            .await
            .unwrap();
        assert!(result.events.is_empty());
        assert_eq!(provider.list_calls(), 0);
    }

    #[tokio::test]
    async fn expired_payload_is_refreshed_before_listing() {
        let (facade, provider) = facade(FakeProvider::new());
        let input = payload(true, Some("refresh"));
        let result = facade
            .list_upcoming_events(input.clone(), 20)
            .await
            .unwrap();
        assert_ne!(result.credentials.token, input.token);
        assert_eq!(provider.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn valid_payload_comes_back_unchanged() {
        let (facade, _) = facade(FakeProvider::new());
        let input = payload(false, Some("refresh"));
        let result = facade
            .list_upcoming_events(input.clone(), 20)
            .await
            .unwrap();
        assert_eq!(result.credentials, input);
    }

    #[tokio::test]
    async fn expired_without_refresh_token() {
        let (facade, provider) = facade(FakeProvider::new());
        let err = facade
            .list_upcoming_events(payload(true, None), 20)
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::CredentialExpired { .. }));
        assert_eq!(provider.list_calls(), 0);
    }

    #[tokio::test]
    async fn listing_failure_is_provider_query() {
        for code in [
            ProviderErrorCode::NetworkError,
            ProviderErrorCode::AuthenticationFailed,
            ProviderErrorCode::ServerError,
            ProviderErrorCode::InvalidResponse,
        ] {
            let (facade, _) = facade(FakeProvider::new().failing_list(code));
            let err = facade
                .list_upcoming_events(payload(false, None), 20)
                .await
                .unwrap_err();
            assert!(matches!(err, CredentialError::ProviderQuery(_)), "{code:?}");
        }
    }

    #[test]
    fn skips_cancelled_and_unparsable() {
        let raw = vec![
            RawEvent::new(RawEventTime::date("2024-05-02"), "Kept"),
            RawEvent::new(RawEventTime::date("2024-05-01"), "Gone").with_status("cancelled"),
            RawEvent::new(RawEventTime::date_time("tomorrow"), "Bad"),
            RawEvent {
                summary: Some("No start".to_string()),
                ..RawEvent::default()
            },
        ];
        let events = to_serialized_events(raw, 20);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "Kept");
    }

    #[test]
    fn ties_keep_provider_order() {
        let raw = vec![
            RawEvent::new(RawEventTime::date_time("2024-05-01T10:00:00Z"), "first"),
            RawEvent::new(RawEventTime::date_time("2024-05-01T12:00:00+02:00"), "second"),
        ];
        let events = to_serialized_events(raw, 20);
        assert_eq!(events[0].summary, "first");
        assert_eq!(events[1].summary, "second");
    }

    #[test]
    fn local_evening_event_stays_before_next_all_day() {
        // 20:00 in Los Angeles is 03:00 UTC on May 2, after midnight UTC.
        let raw = vec![
            RawEvent::new(RawEventTime::date_time("2024-05-01T20:00:00-07:00"), "Dinner"),
            RawEvent::new(RawEventTime::date("2024-05-02"), "Offsite"),
        ];
        let summaries: Vec<_> = to_serialized_events(raw, 20)
            .into_iter()
            .map(|event| event.summary)
            .collect();
        assert_eq!(summaries, ["Dinner", "Offsite"]);
    }

    #[test]
    fn truncation_happens_after_skipping() {
        let raw = vec![
            RawEvent::new(RawEventTime::date("2024-05-01"), "Gone").with_status("cancelled"),
            RawEvent::new(RawEventTime::date("2024-05-02"), "One"),
            RawEvent::new(RawEventTime::date("2024-05-03"), "Two"),
            RawEvent::new(RawEventTime::date("2024-05-04"), "Three"),
        ];
        let events = to_serialized_events(raw, 2);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].summary, "One");
        assert_eq!(events[1].summary, "Two");
    }
}
