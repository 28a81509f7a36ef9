//! HTTP routes.
//!
//! | Route       | Behavior                                              |
//! |-------------|-------------------------------------------------------|
//! | `/`         | placeholder page                                      |
//! | `/auth`     | redirect to the provider consent screen               |
//! | `/callback` | exchange the authorization code, start the session    |
//! | `/events`   | upcoming events as JSON                               |
//! | `/healthz`  | liveness check                                        |

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum_extra::extract::PrivateCookieJar;
use calgate_core::SerializedEvent;
use calgate_providers::{PendingAuthorization, UpcomingEvents};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::session;
use crate::state::AppState;

/// Where unauthenticated requests are sent.
pub const AUTH_PATH: &str = "/auth";

const INDEX_HTML: &str = "<!doctype html>\n<html>\n<head><title>calgate</title></head>\n<body>\n<h1>calgate</h1>\n<p><a href=\"/auth\">Connect your calendar</a>, then visit <a href=\"/events\">/events</a>.</p>\n</body>\n</html>\n";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route(AUTH_PATH, get(auth))
        .route("/callback", get(callback))
        .route("/events", get(events))
        .route("/healthz", get(healthz))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn healthz() -> &'static str {
    "ok"
}

/// GET /auth - start an authorization attempt.
async fn auth(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), AppError> {
    let pending = PendingAuthorization::new();
    let url = state
        .manager()
        .build_authorization_url(state.config().redirect_uri(), Some(&pending))?;
    let jar = session::store_pending(jar, &pending, state.config().secure_cookies())?;

    debug!("redirecting to consent screen");
    Ok((jar, Redirect::to(&url)))
}

/// Query parameters the provider appends to the redirect.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /callback - finish the authorization attempt.
async fn callback(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let (jar, pending) = session::take_pending(jar);

    if let Some(error) = params.error {
        warn!(%error, "provider reported an authorization error");
        return (jar, AppError::bad_request(format!("authorization failed: {}", error))).into_response();
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return (jar, AppError::bad_request("missing authorization code")).into_response();
    };

    if state.config().verify_state {
        let matches = pending
            .as_ref()
            .is_some_and(|p| p.state_matches(params.state.as_deref()));
        if !matches {
            warn!(
                has_pending = pending.is_some(),
                "OAuth state mismatch, rejecting callback"
            );
            return (jar, AppError::bad_request("state mismatch")).into_response();
        }
    }

    let verifier = pending.as_ref().map(|p| p.verifier.as_str());
    let payload = match state
        .manager()
        .exchange_code_for_credentials(&code, state.config().redirect_uri(), verifier)
        .await
    {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "code exchange failed, restarting authorization");
            return (jar, Redirect::to(AUTH_PATH)).into_response();
        }
    };

    match session::store_credentials(jar, &payload, state.config().secure_cookies()) {
        Ok(jar) => {
            info!("session started");
            (jar, Json(payload.redacted())).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// GET /events - upcoming events for the session.
async fn events(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    let Some(payload) = session::load_credentials(&jar, state.manager()) else {
        debug!("no credentials in session");
        return Redirect::to(AUTH_PATH).into_response();
    };

    let result = state
        .facade()
        .list_upcoming_events(payload.clone(), state.config().events_limit)
        .await;

    match result {
        Ok(UpcomingEvents {
            credentials,
            events,
        }) => {
            if credentials == payload {
                return (jar, Json(events)).into_response();
            }
            match session::store_credentials(jar, &credentials, state.config().secure_cookies()) {
                Ok(jar) => (jar, Json(events)).into_response(),
                Err(e) => e.into_response(),
            }
        }
        Err(e) if e.is_auth_failure() => {
            info!(error = %e, "credentials unusable, clearing session");
            (session::clear_credentials(jar), Redirect::to(AUTH_PATH)).into_response()
        }
        Err(e) if state.config().empty_on_provider_error => {
            warn!(error = %e, "provider query failed, answering with no events");
            Json(Vec::<SerializedEvent>::new()).into_response()
        }
        Err(e) => {
            warn!(error = %e, "provider query failed");
            AppError::from(e).into_response()
        }
    }
}
