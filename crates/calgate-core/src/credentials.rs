//! The serialisable OAuth credential kept in a user's session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Margin applied before the recorded expiry.
///
/// A token that expires within this window is treated as already expired so
/// it is not handed to the provider moments before it stops working.
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// Placeholder written in place of secrets in [`CredentialPayload::redacted`].
pub const REDACTED: &str = "<redacted>";

/// Why a credential payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// The payload JSON does not match the expected shape.
    #[error("malformed credential payload: {0}")]
    Malformed(String),

    /// The access token is missing or empty.
    #[error("credential payload has no access token")]
    MissingToken,

    /// The payload was issued for a different OAuth client.
    #[error("credential payload belongs to client {found:?}, expected {expected:?}")]
    ClientMismatch { expected: String, found: String },
}

/// An OAuth credential in the form stored between requests.
///
/// `token` is always present. `refresh_token` is absent when the provider did
/// not grant offline access. A payload without `expiry` never expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPayload {
    /// The access token used for API requests.
    pub token: String,

    /// Long-lived token used to obtain new access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// The provider endpoint that issues and refreshes tokens.
    pub token_uri: String,

    /// The OAuth client this credential was issued to.
    pub client_id: String,

    /// The secret of that OAuth client.
    pub client_secret: String,

    /// Scopes granted with this credential, in provider order.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// When the access token stops being valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl CredentialPayload {
    /// Parses and validates a payload read back from a session.
    ///
    /// Rejects payloads with an empty token and, when `expected_client_id` is
    /// given, payloads minted for another client.
    pub fn from_session_json(
        json: &str,
        expected_client_id: Option<&str>,
    ) -> Result<Self, PayloadError> {
        let payload: Self =
            serde_json::from_str(json).map_err(|e| PayloadError::Malformed(e.to_string()))?;
        payload.validate(expected_client_id)?;
        Ok(payload)
    }

    /// Checks the payload invariants.
    pub fn validate(&self, expected_client_id: Option<&str>) -> Result<(), PayloadError> {
        if self.token.trim().is_empty() {
            return Err(PayloadError::MissingToken);
        }
        if let Some(expected) = expected_client_id
            && expected != self.client_id
        {
            return Err(PayloadError::ClientMismatch {
                expected: expected.to_string(),
                found: self.client_id.clone(),
            });
        }
        Ok(())
    }

    /// Serialises the payload for storage in a session.
    pub fn to_session_json(&self) -> Result<String, PayloadError> {
        serde_json::to_string(self).map_err(|e| PayloadError::Malformed(e.to_string()))
    }

    /// Returns true if the access token is expired (or about to be) at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now >= expiry - Duration::seconds(EXPIRY_SKEW_SECS),
            None => false,
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true if the access token can be used right now.
    pub fn is_valid(&self) -> bool {
        !self.token.is_empty() && !self.is_expired()
    }

    /// Returns true if a refresh token is available.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Returns a copy carrying a freshly issued access token.
    ///
    /// The refresh token is replaced only when the provider rotated it.
    pub fn refreshed(
        &self,
        token: impl Into<String>,
        expires_in_secs: Option<i64>,
        rotated_refresh_token: Option<String>,
    ) -> Self {
        Self {
            token: token.into(),
            refresh_token: rotated_refresh_token.or_else(|| self.refresh_token.clone()),
            expiry: expires_in_secs.map(|secs| Utc::now() + Duration::seconds(secs)),
            ..self.clone()
        }
    }

    /// Returns a copy safe to show to the browser.
    pub fn redacted(&self) -> Self {
        Self {
            client_secret: REDACTED.to_string(),
            ..self.clone()
        }
    }
}
