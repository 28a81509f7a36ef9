//! Per-browser session state kept in encrypted cookies.
//!
//! Two cookies are used:
//!
//! - `calgate_session` holds the [`CredentialPayload`] as JSON
//! - `calgate_oauth` holds the state and PKCE verifier of an authorization
//!   attempt between `/auth` and `/callback`
//!
//! Both are encrypted and authenticated with the server key, so a tampered
//! or foreign cookie reads as absent.

use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, Key, SameSite};
use calgate_core::CredentialPayload;
use calgate_providers::{CredentialManager, PendingAuthorization};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use tracing::debug;

use crate::config::MIN_SESSION_SECRET_LEN;
use crate::error::{AppError, ServerError, ServerResult};

/// Name of the credential cookie.
pub const SESSION_COOKIE: &str = "calgate_session";

/// Name of the pending authorization cookie.
pub const PENDING_COOKIE: &str = "calgate_oauth";

/// How long an authorization attempt stays valid.
pub const PENDING_TTL_SECS: i64 = 600;

/// Derives the cookie key from the configured secret.
pub fn session_key(secret: &str) -> ServerResult<Key> {
    if secret.len() < MIN_SESSION_SECRET_LEN {
        return Err(ServerError::config(format!(
            "session secret must be at least {} bytes",
            MIN_SESSION_SECRET_LEN
        )));
    }
    let digest = Sha512::digest(secret.as_bytes());
    Ok(Key::from(digest.as_slice()))
}

fn cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn removal(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

/// Reads the credential payload, if a valid one for this client is present.
pub fn load_credentials(
    jar: &PrivateCookieJar,
    manager: &CredentialManager,
) -> Option<CredentialPayload> {
    let cookie = jar.get(SESSION_COOKIE)?;
    match manager.restore(cookie.value()) {
        Ok(payload) => Some(payload),
        Err(e) => {
            debug!(error = %e, "ignoring unusable session payload");
            None
        }
    }
}

/// Stores `payload` in the session.
pub fn store_credentials(
    jar: PrivateCookieJar,
    payload: &CredentialPayload,
    secure: bool,
) -> Result<PrivateCookieJar, AppError> {
    let json = payload.to_session_json()?;
    Ok(jar.add(cookie(SESSION_COOKIE, json, secure)))
}

/// Drops the credential payload from the session.
pub fn clear_credentials(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(removal(SESSION_COOKIE))
}

#[derive(Debug, Serialize, Deserialize)]
struct PendingCookie {
    #[serde(flatten)]
    pending: PendingAuthorization,
    issued_at: DateTime<Utc>,
}

/// Remembers an authorization attempt until the provider redirects back.
pub fn store_pending(
    jar: PrivateCookieJar,
    pending: &PendingAuthorization,
    secure: bool,
) -> Result<PrivateCookieJar, AppError> {
    let value = PendingCookie {
        pending: pending.clone(),
        issued_at: Utc::now(),
    };
    let json = serde_json::to_string(&value)
        .map_err(|e| AppError::internal(format!("failed to encode authorization state: {}", e)))?;
    Ok(jar.add(cookie(PENDING_COOKIE, json, secure)))
}

/// Removes the pending authorization and returns it if it is still fresh.
pub fn take_pending(jar: PrivateCookieJar) -> (PrivateCookieJar, Option<PendingAuthorization>) {
    take_pending_at(jar, Utc::now())
}

fn take_pending_at(
    jar: PrivateCookieJar,
    now: DateTime<Utc>,
) -> (PrivateCookieJar, Option<PendingAuthorization>) {
    let Some(cookie) = jar.get(PENDING_COOKIE) else {
        return (jar, None);
    };

    let pending = match serde_json::from_str::<PendingCookie>(cookie.value()) {
        Ok(value) if now - value.issued_at <= Duration::seconds(PENDING_TTL_SECS) => {
            Some(value.pending)
        }
        Ok(_) => {
            debug!("authorization attempt expired");
            None
        }
        Err(e) => {
            debug!(error = %e, "ignoring malformed authorization state");
            None
        }
    };

    (jar.remove(removal(PENDING_COOKIE)), pending)
}
