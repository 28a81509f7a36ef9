//! Google Calendar API client.
//!
//! A thin HTTP client for the `events.list` endpoint of the Calendar API v3.
//! The access token is supplied per call because it belongs to the session,
//! not to the client.

use serde::Deserialize;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::EventQuery;
use crate::raw_event::RawEvent;

/// Google Calendar API client.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    api_base: String,
}

impl GoogleCalendarClient {
    /// Creates a client for the API rooted at `api_base`.
    pub fn new(api_base: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Lists events matching `query`, following pagination until
    /// `max_results` events were collected or no pages remain.
    pub async fn list_events(
        &self,
        access_token: &str,
        query: &EventQuery,
    ) -> ProviderResult<Vec<RawEvent>> {
        if query.max_results == 0 {
            return Ok(Vec::new());
        }

        let mut all_events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let remaining = query.max_results.saturating_sub(all_events.len());
            let page = self
                .list_events_page(access_token, query, remaining, page_token.as_deref())
                .await?;

            all_events.extend(page.items);

            if all_events.len() >= query.max_results {
                all_events.truncate(query.max_results);
                break;
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(
            "fetched {} events from calendar {}",
            all_events.len(),
            query.calendar_id
        );
        Ok(all_events)
    }

    /// Fetches a single page of events.
    async fn list_events_page(
        &self,
        access_token: &str,
        query: &EventQuery,
        max_results: usize,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        let url = format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(&query.calendar_id)
        );

        let mut request = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", query.time_min.to_rfc3339()),
                ("maxResults", max_results.to_string()),
                ("singleEvents", query.single_events.to_string()),
            ]);

        // orderBy=startTime is only accepted for expanded recurring events.
        if query.single_events {
            request = request.query(&[("orderBy", "startTime")]);
        }

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("event listing", e))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(ProviderError::rate_limited(format!(
                "rate limit exceeded{}",
                retry_after
                    .map(|s| format!(", retry after {} seconds", s))
                    .unwrap_or_default()
            ))
            .with_provider("google"));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(
                ProviderError::authentication("access token expired or invalid")
                    .with_provider("google"),
            );
        }

        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(
                ProviderError::authorization("access denied to calendar").with_provider("google")
            );
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_transport("event listing", e))?;

        if status.is_server_error() {
            return Err(
                ProviderError::server(format!("API error ({}): {}", status, body))
                    .with_provider("google"),
            );
        }

        if !status.is_success() {
            return Err(
                ProviderError::bad_request(format!("API error ({}): {}", status, body))
                    .with_provider("google"),
            );
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
                .with_provider("google")
        })
    }
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<RawEvent>,
    #[serde(default)]
    next_page_token: Option<String>,
}
