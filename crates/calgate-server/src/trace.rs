//! Request spans for the HTTP layer.

use std::time::Duration;

use axum::extract::Request;
use axum::response::Response;
use tracing::{Span, field, info, info_span};

/// Opens the span a request's logs are recorded under.
///
/// Only the path is recorded: the callback query carries the OAuth code.
pub(crate) fn request_span(request: &Request) -> Span {
    info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        status = field::Empty,
    )
}

/// Records the status on the request span and logs completion.
pub(crate) fn record_response(response: &Response, latency: Duration, span: &Span) {
    span.record("status", response.status().as_u16());
    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
    info!(latency_ms, "request finished");
}
