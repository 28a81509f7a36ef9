//! CalendarProvider trait definition.
//!
//! This module defines the [`CalendarProvider`] trait, the narrow seam
//! between this service and the calendar backend. It exposes exactly the
//! three network operations the service performs:
//!
//! - exchanging an authorization code for tokens
//! - refreshing an access token
//! - listing events on a calendar

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ProviderResult;
use crate::raw_event::RawEvent;

/// Tokens returned by the provider's token endpoint.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    /// The access token for API requests.
    pub access_token: String,
    /// A refresh token, when offline access was granted (or rotated).
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Space-separated scopes actually granted, if the provider reports them.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenGrant {
    /// Creates a grant with an access token only.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_in: None,
            scope: None,
        }
    }

    /// Builder method to set the refresh token.
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// Builder method to set the lifetime in seconds.
    pub fn with_expires_in(mut self, secs: i64) -> Self {
        self.expires_in = Some(secs);
        self
    }

    /// Granted scopes, if reported.
    pub fn granted_scopes(&self) -> Option<Vec<String>> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .filter(|scopes: &Vec<String>| !scopes.is_empty())
    }
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Parameters for an authorization code exchange.
#[derive(Debug, Clone, Copy)]
pub struct CodeExchange<'a> {
    /// The code the provider appended to the redirect.
    pub code: &'a str,
    /// The redirect URI used to obtain the code.
    pub redirect_uri: &'a str,
    /// The PKCE verifier, when a challenge was sent.
    pub code_verifier: Option<&'a str>,
}

/// Parameters for listing events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// Calendar to read, `primary` for the user's main calendar.
    pub calendar_id: String,
    /// Only events ending after this instant.
    pub time_min: DateTime<Utc>,
    /// Maximum number of events to return.
    pub max_results: usize,
    /// Whether to expand recurring events into instances.
    pub single_events: bool,
}

impl EventQuery {
    /// The primary calendar id.
    pub const PRIMARY: &'static str = "primary";

    /// Upcoming instances on the primary calendar starting from `time_min`.
    pub fn upcoming(time_min: DateTime<Utc>, max_results: usize) -> Self {
        Self {
            calendar_id: Self::PRIMARY.to_string(),
            time_min,
            max_results,
            single_events: true,
        }
    }
}

/// A boxed future for async trait methods.
///
/// Keeps the trait object-safe so the server can hold an
/// `Arc<dyn CalendarProvider>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The calendar backend as seen by the credential manager and event facade.
///
/// Implementations perform one network round trip per call and hold no
/// per-user state.
pub trait CalendarProvider: Send + Sync {
    /// Returns the name of this provider (e.g., "google").
    fn name(&self) -> &str;

    /// Exchanges an authorization code for tokens.
    fn exchange_code<'a>(&'a self, request: CodeExchange<'a>) -> BoxFuture<'a, ProviderResult<TokenGrant>>;

    /// Obtains a new access token from a refresh token.
    fn refresh_token<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, ProviderResult<TokenGrant>>;

    /// Lists events, ordered by start time.
    fn list_events<'a>(
        &'a self,
        access_token: &'a str,
        query: &'a EventQuery,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>>;
}
