//! Error types for calendar provider operations.
//!
//! Two layers live here:
//!
//! - [`ProviderError`] describes what went wrong on the wire (HTTP status,
//!   network failure, unparsable body).
//! - [`CredentialError`] is what the credential manager and event facade
//!   report to the HTTP layer: a failed code exchange, credentials that can
//!   no longer be refreshed, or a provider that could not be queried.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Authentication failed or credentials are invalid/expired.
    AuthenticationFailed,
    /// Authorization failed - user lacks permission.
    AuthorizationFailed,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// Rate limit exceeded - too many requests.
    RateLimited,
    /// Server returned an error (5xx status codes).
    ServerError,
    /// Invalid response from the server - parse error, unexpected format.
    InvalidResponse,
    /// Request was invalid (400) - bad parameters, malformed request.
    BadRequest,
    /// Configuration error - missing or invalid config.
    ConfigurationError,
}

impl ProviderErrorCode {
    /// Returns true if the failure says nothing about the credential itself.
    ///
    /// A transient failure during a token refresh keeps the session; any
    /// other failure means the refresh token is no longer usable.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError | Self::InvalidResponse
        )
    }

    /// Returns a machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while talking to a calendar provider.
#[derive(Debug, Error)]
pub struct ProviderError {
    /// The error code categorizing this error.
    code: ProviderErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The provider that generated this error (e.g., "google").
    provider: Option<String>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::BadRequest, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Maps a reqwest transport failure.
    pub fn from_transport(context: &str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("{context}: request timeout")
        } else if err.is_connect() {
            format!("{context}: connection failed")
        } else {
            format!("{context}: request failed")
        };
        Self::network(message).with_source(err)
    }

    /// Sets the provider name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the provider name, if set.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Returns true if the failure is transient (see [`ProviderErrorCode::is_transient`]).
    pub fn is_transient(&self) -> bool {
        self.code.is_transient()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors surfaced by the credential manager and the event facade.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The authorization code was rejected (invalid, expired, redirect URI
    /// mismatch) or the token endpoint could not be reached.
    #[error("authorization code exchange failed: {0}")]
    AuthExchange(#[source] ProviderError),

    /// The access token expired and there is no usable refresh token.
    #[error("credentials expired: {reason}")]
    CredentialExpired { reason: String },

    /// The provider could not be queried right now.
    #[error("calendar provider query failed: {0}")]
    ProviderQuery(#[source] ProviderError),
}

impl CredentialError {
    /// Creates a credential expired error.
    pub fn expired(reason: impl Into<String>) -> Self {
        Self::CredentialExpired {
            reason: reason.into(),
        }
    }

    /// Returns true when the user has to go through the consent flow again.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthExchange(_) | Self::CredentialExpired { .. })
    }

    /// Returns a machine-readable name for this error.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthExchange(_) => "auth_exchange_failed",
            Self::CredentialExpired { .. } => "credential_expired",
            Self::ProviderQuery(_) => "provider_unavailable",
        }
    }
}

/// A specialized Result type for credential and event operations.
pub type CredentialResult<T> = Result<T, CredentialError>;
