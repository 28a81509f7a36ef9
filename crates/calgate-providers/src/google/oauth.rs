//! Google OAuth 2.0 token endpoint client.
//!
//! Performs the two token requests of the authorization code flow: the
//! initial code exchange (optionally with a PKCE verifier) and access token
//! refresh. The consent-screen redirect is handled by the web layer, so
//! there is no loopback server here.

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::OAuthCredentials;
use crate::error::{ProviderError, ProviderResult};
use crate::provider::{CodeExchange, TokenGrant};

/// Client for Google's token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    token_uri: String,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a token client posting to `token_uri`.
    pub fn new(
        credentials: OAuthCredentials,
        token_uri: impl Into<String>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            credentials,
            token_uri: token_uri.into(),
            http_client,
        }
    }

    /// Exchanges an authorization code for tokens.
    pub async fn exchange_code(&self, request: CodeExchange<'_>) -> ProviderResult<TokenGrant> {
        let mut params = vec![
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", request.code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", request.redirect_uri),
        ];
        if let Some(verifier) = request.code_verifier {
            params.push(("code_verifier", verifier));
        }

        let grant = self.post_token_request(&params, "token exchange").await?;
        info!("successfully obtained tokens");
        Ok(grant)
    }

    /// Obtains a new access token from a refresh token.
    ///
    /// Google normally omits `refresh_token` from the response; when it does
    /// send one the caller should replace the stored refresh token.
    pub async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<TokenGrant> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let grant = self.post_token_request(&params, "token refresh").await?;
        info!("successfully refreshed access token");
        Ok(grant)
    }

    async fn post_token_request(
        &self,
        params: &[(&str, &str)],
        context: &str,
    ) -> ProviderResult<TokenGrant> {
        debug!(token_uri = %self.token_uri, "{} request", context);

        let response = self
            .http_client
            .post(&self.token_uri)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(context, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_transport(context, e))?;

        if !status.is_success() {
            return Err(token_error(status, &body, context));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("{}: invalid token response: {}", context, e))
        })
    }
}

/// Error body returned by Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Maps a non-success token endpoint response.
///
/// 400 and 401 mean the code or refresh token was refused (`invalid_grant`,
/// `invalid_client`, redirect mismatch). Those say something about the
/// credential; everything else does not.
fn token_error(status: reqwest::StatusCode, body: &str, context: &str) -> ProviderError {
    let detail = match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(TokenErrorResponse {
            error,
            error_description: Some(description),
        }) => format!("{}: {}", error, description),
        Ok(TokenErrorResponse { error, .. }) => error,
        Err(_) => format!("HTTP {}", status.as_u16()),
    };
    let message = format!("{} failed ({}): {}", context, status.as_u16(), detail);

    match status.as_u16() {
        400 | 401 => ProviderError::authentication(message),
        403 => ProviderError::authorization(message),
        429 => ProviderError::rate_limited(message),
        500..=599 => ProviderError::server(message),
        _ => ProviderError::bad_request(message),
    }
    .with_provider("google")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use reqwest::StatusCode;

    #[test]
    fn invalid_grant_is_authentication_failure() {
        let body = r#"{"error": "invalid_grant", "error_description": "Bad Request"}"#;
        let err = token_error(StatusCode::BAD_REQUEST, body, "token exchange");
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(err.message(), "token exchange failed (400): invalid_grant: Bad Request");
        assert_eq!(err.provider(), Some("google"));
        assert!(!err.is_transient());
    }

    #[test]
    fn server_errors_are_transient() {
        let err = token_error(StatusCode::SERVICE_UNAVAILABLE, "<html>", "token refresh");
        assert_eq!(err.code(), ProviderErrorCode::ServerError);
        assert_eq!(err.message(), "token refresh failed (503): HTTP 503");
        assert!(err.is_transient());
    }

    #[test]
    fn error_without_description() {
        let err = token_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error": "invalid_client"}"#,
            "token refresh",
        );
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert!(err.message().ends_with("invalid_client"));
    }

    #[test]
    fn rate_limit() {
        let err = token_error(StatusCode::TOO_MANY_REQUESTS, "", "token refresh");
        assert_eq!(err.code(), ProviderErrorCode::RateLimited);
    }
}
