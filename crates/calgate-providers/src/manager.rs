//! Credential/Token manager.
//!
//! Builds consent-screen URLs, exchanges authorization codes for
//! [`CredentialPayload`]s and refreshes expired access tokens. The manager
//! holds only configuration; every call works on the caller's own copy of
//! the payload, so nothing here needs locking.

use std::sync::Arc;

use calgate_core::{CredentialPayload, PayloadError};
use chrono::{Duration, Utc};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{CredentialError, CredentialResult, ProviderError, ProviderResult};
use crate::pkce::PendingAuthorization;
use crate::provider::{CalendarProvider, CodeExchange};

/// Builds the provider consent-screen URL.
///
/// Requests offline access so a refresh token is issued, and asks the
/// provider to include scopes granted earlier. When `pending` is given its
/// state and PKCE challenge are attached. No network access.
pub fn authorization_url(
    config: &ClientConfig,
    redirect_uri: &str,
    pending: Option<&PendingAuthorization>,
) -> ProviderResult<String> {
    let mut url = Url::parse(&config.endpoints.auth_uri).map_err(|e| {
        ProviderError::configuration(format!(
            "invalid authorization endpoint {:?}: {}",
            config.endpoints.auth_uri, e
        ))
    })?;

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", config.client_id())
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &config.scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("include_granted_scopes", "true")
            .append_pair("prompt", "consent");

        if let Some(pending) = pending {
            query
                .append_pair("state", &pending.state)
                .append_pair("code_challenge", &pending.challenge())
                .append_pair("code_challenge_method", "S256");
        }
    }

    Ok(url.into())
}

/// Obtains and maintains OAuth credentials for one configured client.
#[derive(Clone)]
pub struct CredentialManager {
    config: Arc<ClientConfig>,
    provider: Arc<dyn CalendarProvider>,
}

impl CredentialManager {
    /// Creates a manager for `config` backed by `provider`.
    pub fn new(config: ClientConfig, provider: Arc<dyn CalendarProvider>) -> Self {
        Self {
            config: Arc::new(config),
            provider,
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the provider backing this manager.
    pub fn provider(&self) -> &Arc<dyn CalendarProvider> {
        &self.provider
    }

    /// Builds the consent-screen URL for `redirect_uri`.
    pub fn build_authorization_url(
        &self,
        redirect_uri: &str,
        pending: Option<&PendingAuthorization>,
    ) -> ProviderResult<String> {
        authorization_url(&self.config, redirect_uri, pending)
    }

    /// Parses a payload read back from a session, rejecting payloads that
    /// are malformed, have no token, or belong to another client.
    pub fn restore(&self, json: &str) -> Result<CredentialPayload, PayloadError> {
        CredentialPayload::from_session_json(json, Some(self.config.client_id()))
    }

    /// Exchanges an authorization code for a credential payload.
    ///
    /// One round trip to the token endpoint. Any failure, including an empty
    /// access token in the response, is reported as
    /// [`CredentialError::AuthExchange`].
    pub async fn exchange_code_for_credentials(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> CredentialResult<CredentialPayload> {
        let request = CodeExchange {
            code,
            redirect_uri,
            code_verifier,
        };

        let grant = self.provider.exchange_code(request).await.map_err(|e| {
            warn!(provider = self.provider.name(), error = %e, "authorization code exchange failed");
            CredentialError::AuthExchange(e)
        })?;

        if grant.access_token.trim().is_empty() {
            return Err(CredentialError::AuthExchange(ProviderError::invalid_response(
                "token endpoint returned an empty access token",
            )));
        }

        let scopes = grant
            .granted_scopes()
            .unwrap_or_else(|| self.config.scopes.clone());
        let expiry = grant.expires_in.map(|secs| Utc::now() + Duration::seconds(secs));

        info!(
            provider = self.provider.name(),
            has_refresh_token = grant.refresh_token.is_some(),
            "obtained credentials"
        );

        Ok(CredentialPayload {
            token: grant.access_token,
            refresh_token: grant.refresh_token,
            token_uri: self.config.endpoints.token_uri.clone(),
            client_id: self.config.credentials.client_id.clone(),
            client_secret: self.config.credentials.client_secret.clone(),
            scopes,
            expiry,
        })
    }

    /// Returns a payload whose access token is usable now.
    ///
    /// A valid payload comes back unchanged without any network access. An
    /// expired one is refreshed with a single round trip when it carries a
    /// refresh token; without one the result is
    /// [`CredentialError::CredentialExpired`]. A refresh token the provider
    /// rejects is also `CredentialExpired`, while transient provider
    /// failures are [`CredentialError::ProviderQuery`].
    pub async fn refresh_if_needed(
        &self,
        payload: CredentialPayload,
    ) -> CredentialResult<CredentialPayload> {
        if !payload.is_expired() {
            debug!("access token still valid");
            return Ok(payload);
        }

        let Some(refresh_token) = payload.refresh_token.as_deref().filter(|t| !t.is_empty())
        else {
            info!("access token expired and no refresh token is available");
            return Err(CredentialError::expired(
                "access token expired and no refresh token was granted",
            ));
        };

        debug!("refreshing expired access token");

        match self.provider.refresh_token(refresh_token).await {
            Ok(grant) if grant.access_token.trim().is_empty() => Err(
                CredentialError::ProviderQuery(ProviderError::invalid_response(
                    "token endpoint returned an empty access token",
                )),
            ),
            Ok(grant) => {
                info!(provider = self.provider.name(), "refreshed access token");
                Ok(payload.refreshed(grant.access_token, grant.expires_in, grant.refresh_token))
            }
            Err(e) if e.is_transient() => {
                warn!(error = %e, "token refresh failed, keeping credentials");
                Err(CredentialError::ProviderQuery(e))
            }
            Err(e) => {
                warn!(error = %e, "refresh token rejected");
                Err(CredentialError::expired(format!("refresh token rejected: {}", e)))
            }
        }
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("config", &self.config)
            .field("provider", &self.provider.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuthCredentials;
    use crate::error::ProviderErrorCode;
    use crate::fake::FakeProvider;

    const REDIRECT: &str = "http://localhost:5000/callback";

    fn test_config() -> ClientConfig {
        ClientConfig::new(
            OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret"),
            REDIRECT,
        )
    }

    fn manager(provider: FakeProvider) -> (CredentialManager, Arc<FakeProvider>) {
        let provider = Arc::new(provider);
        (
            CredentialManager::new(test_config(), provider.clone()),
            provider,
        )
    }

    fn expired_payload(refresh_token: Option<&str>) -> CredentialPayload {
        CredentialPayload {
            token: "stale-token".to_string(),
            refresh_token: refresh_token.map(str::to_string),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            client_id: "test-client.apps.googleusercontent.com".to_string(),
            client_secret: "test-secret".to_string(),
            scopes: vec![ClientConfig::CALENDAR_SCOPE.to_string()],
            expiry: Some(Utc::now() - Duration::hours(1)),
        }
    }

    fn query_pairs(url: &str) -> Vec<(String, String)> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn param<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn auth_url_requests_offline_access() {
        let url = authorization_url(&test_config(), REDIRECT, None).unwrap();
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));

        let pairs = query_pairs(&url);
        assert_eq!(param(&pairs, "client_id"), Some("test-client.apps.googleusercontent.com"));
        assert_eq!(param(&pairs, "redirect_uri"), Some(REDIRECT));
        assert_eq!(param(&pairs, "response_type"), Some("code"));
        assert_eq!(param(&pairs, "scope"), Some(ClientConfig::CALENDAR_SCOPE));
        assert_eq!(param(&pairs, "access_type"), Some("offline"));
        assert_eq!(param(&pairs, "include_granted_scopes"), Some("true"));
        assert_eq!(param(&pairs, "state"), None);
    }

    #[test]
    fn auth_url_is_deterministic() {
        let config = test_config();
        assert_eq!(
            authorization_url(&config, REDIRECT, None).unwrap(),
            authorization_url(&config, REDIRECT, None).unwrap()
        );

        let pending = PendingAuthorization::new();
        assert_eq!(
            authorization_url(&config, REDIRECT, Some(&pending)).unwrap(),
            authorization_url(&config, REDIRECT, Some(&pending)).unwrap()
        );
    }

    #[test]
    fn auth_url_carries_state_and_challenge() {
        let pending = PendingAuthorization::new();
        let url = authorization_url(&test_config(), REDIRECT, Some(&pending)).unwrap();
        let pairs = query_pairs(&url);
        assert_eq!(param(&pairs, "state"), Some(pending.state.as_str()));
        assert_eq!(param(&pairs, "code_challenge"), Some(pending.challenge().as_str()));
        assert_eq!(param(&pairs, "code_challenge_method"), Some("S256"));
    }

    #[test]
    fn auth_url_joins_multiple_scopes() {
        let config = test_config().with_scopes(["a", "b"]);
        let pairs = query_pairs(&authorization_url(&config, REDIRECT, None).unwrap());
        assert_eq!(param(&pairs, "scope"), Some("a b"));
    }

    #[test]
    fn invalid_auth_endpoint_is_a_configuration_error() {
        let mut config = test_config();
        config.endpoints.auth_uri = "::not a url::".to_string();
        let err = authorization_url(&config, REDIRECT, None).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn exchange_valid_code() {
        let (manager, provider) = manager(FakeProvider::new().with_valid_code("valid123"));

        let payload = manager
            .exchange_code_for_credentials("valid123", REDIRECT, Some("verifier"))
            .await
            .unwrap();

        assert!(!payload.token.is_empty());
        assert!(payload.refresh_token.is_some());
        assert_eq!(payload.client_id, "test-client.apps.googleusercontent.com");
        assert_eq!(payload.client_secret, "test-secret");
        assert_eq!(payload.token_uri, "https://oauth2.googleapis.com/token");
        assert_eq!(payload.scopes, vec![ClientConfig::CALENDAR_SCOPE.to_string()]);
        assert!(!payload.is_expired());
        assert_eq!(provider.last_verifier().as_deref(), Some("verifier"));
    }

    #[tokio::test]
    async fn exchange_invalid_code() {
        let (manager, _) = manager(FakeProvider::new().with_valid_code("valid123"));

        let err = manager
            .exchange_code_for_credentials("expired-code", REDIRECT, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::AuthExchange(_)));
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn exchange_network_failure_is_auth_exchange() {
        let (manager, _) = manager(
            FakeProvider::new()
                .with_valid_code("valid123")
                .failing_exchange(ProviderErrorCode::NetworkError),
        );

        let err = manager
            .exchange_code_for_credentials("valid123", REDIRECT, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::AuthExchange(_)));
    }

    #[tokio::test]
    async fn valid_payload_is_returned_unchanged() {
        let (manager, provider) = manager(FakeProvider::new());
        let mut payload = expired_payload(Some("refresh"));
        payload.expiry = Some(Utc::now() + Duration::hours(1));

        let result = manager.refresh_if_needed(payload.clone()).await.unwrap();
        assert_eq!(result, payload);
        assert_eq!(provider.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn expired_payload_with_refresh_token_gets_new_token() {
        let (manager, provider) = manager(FakeProvider::new());
        let payload = expired_payload(Some("refresh"));

        let refreshed = manager.refresh_if_needed(payload.clone()).await.unwrap();
        assert_ne!(refreshed.token, payload.token);
        assert_eq!(refreshed.refresh_token.as_deref(), Some("refresh"));
        assert!(!refreshed.is_expired());
        assert_eq!(provider.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn expired_payload_without_refresh_token_fails() {
        let (manager, provider) = manager(FakeProvider::new());

        let err = manager
            .refresh_if_needed(expired_payload(None))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::CredentialExpired { .. }));
        assert_eq!(provider.refresh_calls(), 0);

        let err = manager
            .refresh_if_needed(expired_payload(Some("")))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::CredentialExpired { .. }));
    }

    #[tokio::test]
    async fn rejected_refresh_token_means_expired() {
        let (manager, _) =
            manager(FakeProvider::new().failing_refresh(ProviderErrorCode::AuthenticationFailed));

        let err = manager
            .refresh_if_needed(expired_payload(Some("revoked")))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::CredentialExpired { .. }));
    }

    #[tokio::test]
    async fn transient_refresh_failure_is_a_query_error() {
        let (manager, _) =
            manager(FakeProvider::new().failing_refresh(ProviderErrorCode::NetworkError));

        let err = manager
            .refresh_if_needed(expired_payload(Some("refresh")))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::ProviderQuery(_)));
        assert!(!err.is_auth_failure());
    }

    #[test]
    fn restore_checks_client() {
        let (manager, _) = manager(FakeProvider::new());
        let json = expired_payload(None).to_session_json().unwrap();
        assert!(manager.restore(&json).is_ok());

        let mut foreign = expired_payload(None);
        foreign.client_id = "someone-else".to_string();
        let json = foreign.to_session_json().unwrap();
        assert!(matches!(
            manager.restore(&json),
            Err(PayloadError::ClientMismatch { .. })
        ));
    }
}
