//! HTTP surface for calgate.
//!
//! This crate provides the axum application that:
//! - sends the user through the provider's OAuth consent screen
//! - keeps the resulting credentials in an encrypted session cookie
//! - serves the user's upcoming events as JSON
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use calgate_providers::{ClientConfig, GoogleProvider, OAuthCredentials};
//! use calgate_server::{AppState, ServerConfig, serve};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClientConfig::new(
//!         OAuthCredentials::new("id.apps.googleusercontent.com", "secret"),
//!         "http://localhost:5000/callback",
//!     );
//!     let provider = Arc::new(GoogleProvider::new(&client)?);
//!     let config = ServerConfig::new(client);
//!     let state = AppState::new(config, "a session secret of at least 32 bytes", provider)?;
//!     serve(state).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod routes;
mod session;
mod state;
mod trace;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::{MIN_SESSION_SECRET_LEN, ServerArgs, ServerConfig, load_dotenv};
pub use error::{AppError, ErrorResponse, ServerError, ServerResult};
pub use routes::{AUTH_PATH, CallbackParams};
pub use session::{PENDING_COOKIE, PENDING_TTL_SECS, SESSION_COOKIE, session_key};
pub use state::AppState;

/// Builds the application router with request tracing.
pub fn app(state: AppState) -> Router {
    routes::router().with_state(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(trace::request_span)
            .on_response(trace::record_response),
    )
}

/// Binds the configured address and serves until Ctrl-C or SIGTERM.
pub async fn serve(state: AppState) -> ServerResult<()> {
    let addr = state.config().bind;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::bind(addr, e))?;

    info!(%addr, "calgate listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl-C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
