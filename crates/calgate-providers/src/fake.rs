//! An in-memory [`CalendarProvider`] for tests and local development.
//!
//! It accepts a fixed set of authorization codes, hands out numbered access
//! tokens, and serves a canned event list. Each operation can be switched to
//! fail with a chosen [`ProviderErrorCode`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider, CodeExchange, EventQuery, TokenGrant};
use crate::raw_event::RawEvent;

/// A scripted calendar provider.
#[derive(Debug, Default)]
pub struct FakeProvider {
    valid_codes: Vec<String>,
    issue_refresh_token: bool,
    expires_in: Option<i64>,
    events: Vec<RawEvent>,
    exchange_failure: Option<ProviderErrorCode>,
    refresh_failure: Option<ProviderErrorCode>,
    list_failure: Option<ProviderErrorCode>,
    issued: AtomicUsize,
    exchange_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    list_calls: AtomicUsize,
    last_query: Mutex<Option<EventQuery>>,
    last_verifier: Mutex<Option<String>>,
}

impl FakeProvider {
    /// Creates a provider that accepts no codes and has no events.
    ///
    /// Issued grants carry a refresh token and a one hour lifetime.
    pub fn new() -> Self {
        Self {
            issue_refresh_token: true,
            expires_in: Some(3600),
            ..Self::default()
        }
    }

    /// Accepts `code` in [`CalendarProvider::exchange_code`].
    pub fn with_valid_code(mut self, code: impl Into<String>) -> Self {
        self.valid_codes.push(code.into());
        self
    }

    /// Controls whether code exchanges grant a refresh token.
    pub fn with_refresh_token(mut self, issue: bool) -> Self {
        self.issue_refresh_token = issue;
        self
    }

    /// Sets the lifetime reported for issued access tokens.
    pub fn with_expires_in(mut self, secs: Option<i64>) -> Self {
        self.expires_in = secs;
        self
    }

    /// Sets the events returned by [`CalendarProvider::list_events`].
    pub fn with_events(mut self, events: Vec<RawEvent>) -> Self {
        self.events = events;
        self
    }

    /// Makes every code exchange fail with `code`.
    pub fn failing_exchange(mut self, code: ProviderErrorCode) -> Self {
        self.exchange_failure = Some(code);
        self
    }

    /// Makes every refresh fail with `code`.
    pub fn failing_refresh(mut self, code: ProviderErrorCode) -> Self {
        self.refresh_failure = Some(code);
        self
    }

    /// Makes every event listing fail with `code`.
    pub fn failing_list(mut self, code: ProviderErrorCode) -> Self {
        self.list_failure = Some(code);
        self
    }

    /// Number of code exchanges attempted.
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    /// Number of refreshes attempted.
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Number of event listings attempted.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// The most recent event query.
    pub fn last_query(&self) -> Option<EventQuery> {
        self.last_query
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The PKCE verifier sent with the most recent code exchange.
    pub fn last_verifier(&self) -> Option<String> {
        self.last_verifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_access_token(&self) -> String {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        format!("fake-access-{n}")
    }

    fn failure(code: ProviderErrorCode, operation: &str) -> ProviderError {
        ProviderError::new(code, format!("{operation} failed")).with_provider("fake")
    }
}

impl CalendarProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn exchange_code<'a>(&'a self, request: CodeExchange<'a>) -> BoxFuture<'a, ProviderResult<TokenGrant>> {
        Box::pin(async move {
            self.exchange_calls.fetch_add(1, Ordering::SeqCst);
            *self
                .last_verifier
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = request.code_verifier.map(str::to_string);

            if let Some(code) = self.exchange_failure {
                return Err(Self::failure(code, "token exchange"));
            }
            if !self.valid_codes.iter().any(|c| c == request.code) {
                return Err(ProviderError::authentication("invalid_grant: Malformed auth code.")
                    .with_provider("fake"));
            }

            let mut grant = TokenGrant::new(self.next_access_token());
            grant.expires_in = self.expires_in;
            if self.issue_refresh_token {
                grant.refresh_token = Some(format!("fake-refresh-{}", request.code));
            }
            Ok(grant)
        })
    }

    fn refresh_token<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, ProviderResult<TokenGrant>> {
        Box::pin(async move {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(code) = self.refresh_failure {
                return Err(Self::failure(code, "token refresh"));
            }
            if refresh_token.is_empty() {
                return Err(ProviderError::authentication("invalid_grant: empty refresh token"));
            }

            let mut grant = TokenGrant::new(self.next_access_token());
            grant.expires_in = self.expires_in;
            Ok(grant)
        })
    }

    fn list_events<'a>(
        &'a self,
        _access_token: &'a str,
        query: &'a EventQuery,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_query.lock().unwrap_or_else(PoisonError::into_inner) = Some(query.clone());

            if let Some(code) = self.list_failure {
                return Err(Self::failure(code, "event listing"));
            }
            Ok(self.events.iter().take(query.max_results).cloned().collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw_event::RawEventTime;

    fn exchange(code: &str) -> CodeExchange<'_> {
        CodeExchange {
            code,
            redirect_uri: "http://localhost/callback",
            code_verifier: None,
        }
    }

    #[tokio::test]
    async fn accepts_only_known_codes() {
        let provider = FakeProvider::new().with_valid_code("valid123");

        let grant = provider.exchange_code(exchange("valid123")).await.unwrap();
        assert_eq!(grant.access_token, "fake-access-1");
        assert_eq!(grant.refresh_token.as_deref(), Some("fake-refresh-valid123"));

        let err = provider.exchange_code(exchange("nope")).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(provider.exchange_calls(), 2);
    }

    #[tokio::test]
    async fn refresh_issues_new_token() {
        let provider = FakeProvider::new();
        let first = provider.refresh_token("r").await.unwrap();
        let second = provider.refresh_token("r").await.unwrap();
        assert_ne!(first.access_token, second.access_token);
        assert_eq!(provider.refresh_calls(), 2);
    }

    #[tokio::test]
    async fn list_respects_max_results_and_failures() {
        let events = vec![
            RawEvent::new(RawEventTime::date("2024-05-01"), "a"),
            RawEvent::new(RawEventTime::date("2024-05-02"), "b"),
        ];
        let provider = FakeProvider::new().with_events(events);
        let query = EventQuery::upcoming(chrono::Utc::now(), 1);
        assert_eq!(provider.list_events("t", &query).await.unwrap().len(), 1);
        assert_eq!(provider.last_query(), Some(query.clone()));

        let failing = FakeProvider::new().failing_list(ProviderErrorCode::NetworkError);
        let err = failing.list_events("t", &query).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NetworkError);
        assert_eq!(err.provider(), Some("fake"));
    }
}
