//! Google Calendar provider implementation.
//!
//! This module implements the [`CalendarProvider`] trait for Google Calendar.

use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider, CodeExchange, EventQuery, TokenGrant};
use crate::raw_event::RawEvent;

use super::client::GoogleCalendarClient;
use super::oauth::OAuthClient;

/// Google Calendar provider.
///
/// Holds one pooled HTTP client shared by the token endpoint and the
/// Calendar API. Tokens are passed in per call, so a single provider serves
/// every session.
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    oauth_client: OAuthClient,
    api_client: GoogleCalendarClient,
}

impl GoogleProvider {
    /// Creates a new Google provider with the given configuration.
    pub fn new(config: &ClientConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        debug!(
            token_uri = %config.endpoints.token_uri,
            api_base = %config.endpoints.api_base,
            timeout_secs = config.timeout.as_secs(),
            "created Google provider"
        );

        Ok(Self {
            oauth_client: OAuthClient::new(
                config.credentials.clone(),
                config.endpoints.token_uri.clone(),
                http_client.clone(),
            ),
            api_client: GoogleCalendarClient::new(config.endpoints.api_base.clone(), http_client),
        })
    }
}

impl CalendarProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn exchange_code<'a>(&'a self, request: CodeExchange<'a>) -> BoxFuture<'a, ProviderResult<TokenGrant>> {
        Box::pin(async move { self.oauth_client.exchange_code(request).await })
    }

    fn refresh_token<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, ProviderResult<TokenGrant>> {
        Box::pin(async move { self.oauth_client.refresh_token(refresh_token).await })
    }

    fn list_events<'a>(
        &'a self,
        access_token: &'a str,
        query: &'a EventQuery,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move { self.api_client.list_events(access_token, query).await })
    }
}
