//! OAuth client configuration.

use std::time::Duration;

/// Google OAuth and Calendar endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Consent screen URL.
    pub auth_uri: String,
    /// Token exchange and refresh URL.
    pub token_uri: String,
    /// Base URL of the Calendar API v3.
    pub api_base: String,
}

impl Endpoints {
    /// Google's OAuth consent screen.
    pub const GOOGLE_AUTH_URI: &'static str = "https://accounts.google.com/o/oauth2/auth";
    /// Google's token endpoint.
    pub const GOOGLE_TOKEN_URI: &'static str = "https://oauth2.googleapis.com/token";
    /// Google Calendar API v3.
    pub const GOOGLE_API_BASE: &'static str = "https://www.googleapis.com/calendar/v3";

    /// Points every endpoint at `base` (used against local fakes).
    pub fn local(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_uri: format!("{base}/o/oauth2/auth"),
            token_uri: format!("{base}/token"),
            api_base: format!("{base}/calendar/v3"),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth_uri: Self::GOOGLE_AUTH_URI.to_string(),
            token_uri: Self::GOOGLE_TOKEN_URI.to_string(),
            api_base: Self::GOOGLE_API_BASE.to_string(),
        }
    }
}

/// OAuth 2.0 client credentials issued by the Google Cloud Console.
#[derive(Clone)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID.
    pub client_id: String,
    /// The OAuth 2.0 client secret.
    pub client_secret: String,
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Validates that the credentials appear to be correctly formatted.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Everything needed to talk to the provider on behalf of this service.
///
/// Built once at startup and shared read-only across requests.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// OAuth client credentials.
    pub credentials: OAuthCredentials,

    /// Scopes requested on the consent screen. Never contains duplicates.
    pub scopes: Vec<String>,

    /// Where the provider sends the user back after consent.
    pub redirect_uri: String,

    /// Provider endpoints.
    pub endpoints: Endpoints,

    /// Bound on every request to the provider.
    pub timeout: Duration,

    /// User agent string for provider requests.
    pub user_agent: String,
}

impl ClientConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    /// Read/write access to the user's calendars.
    pub const CALENDAR_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    /// Creates a configuration with the calendar scope and Google endpoints.
    pub fn new(credentials: OAuthCredentials, redirect_uri: impl Into<String>) -> Self {
        Self {
            credentials,
            scopes: vec![Self::CALENDAR_SCOPE.to_string()],
            redirect_uri: redirect_uri.into(),
            endpoints: Endpoints::default(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("calgate/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the OAuth scopes, dropping duplicates but keeping order.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes.clear();
        for scope in scopes {
            let scope = scope.into();
            if !self.scopes.contains(&scope) {
                self.scopes.push(scope);
            }
        }
        self
    }

    /// Sets the provider endpoints.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Returns the OAuth client id.
    pub fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }

        let redirect = url::Url::parse(&self.redirect_uri)
            .map_err(|e| format!("invalid redirect URI {:?}: {}", self.redirect_uri, e))?;
        if !matches!(redirect.scheme(), "http" | "https") {
            return Err(format!(
                "redirect URI must be http(s), got {:?}",
                redirect.scheme()
            ));
        }

        for (name, value) in [
            ("authorization endpoint", &self.endpoints.auth_uri),
            ("token endpoint", &self.endpoints.token_uri),
            ("API base", &self.endpoints.api_base),
        ] {
            url::Url::parse(value).map_err(|e| format!("invalid {} {:?}: {}", name, value, e))?;
        }

        if self.timeout.is_zero() {
            return Err("timeout must be greater than zero".to_string());
        }

        Ok(())
    }
}
