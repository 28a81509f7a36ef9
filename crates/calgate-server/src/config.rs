//! Server configuration.
//!
//! Values come from command-line flags with environment fallbacks; `main`
//! loads a `.env` file first so local development needs no exported
//! variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use calgate_core::TracingConfig;
use calgate_providers::{ClientConfig, OAuthCredentials};
use clap::{ArgAction, Parser};

use crate::error::{ServerError, ServerResult};

/// Shortest accepted session secret, in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Loads `.env` from the working directory or one of its parents.
///
/// Returns the path that was loaded, or `None` when there is no such file.
/// A file that exists but cannot be read or parsed is an error.
pub fn load_dotenv() -> ServerResult<Option<PathBuf>> {
    optional_env_file(dotenvy::dotenv())
}

fn optional_env_file<T>(result: Result<T, dotenvy::Error>) -> ServerResult<Option<T>> {
    match result {
        Ok(loaded) => Ok(Some(loaded)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(ServerError::EnvFile(e)),
    }
}

/// calgate - upcoming calendar events over HTTP
#[derive(Parser)]
#[command(name = "calgate-server")]
#[command(author, version, about, long_about = None)]
pub struct ServerArgs {
    /// OAuth client ID
    #[arg(long, env = "API_CLIENT_ID")]
    pub client_id: String,

    /// OAuth client secret
    #[arg(long, env = "API_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// Redirect URI registered with the provider (this server's /callback)
    #[arg(long, env = "CALLBACK_URL")]
    pub callback_url: String,

    /// Secret used to encrypt session cookies (at least 32 bytes)
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub session_secret: String,

    /// Address to listen on
    #[arg(long, env = "CALGATE_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Maximum number of events returned by /events
    #[arg(long, env = "EVENTS_LIMIT", default_value_t = ServerConfig::DEFAULT_EVENTS_LIMIT)]
    pub events_limit: usize,

    /// Timeout for each request to the provider, in seconds
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value_t = ClientConfig::DEFAULT_TIMEOUT_SECS)]
    pub provider_timeout_secs: u64,

    /// Check the OAuth state parameter on /callback
    #[arg(long, env = "VERIFY_OAUTH_STATE", default_value_t = true, action = ArgAction::Set)]
    pub verify_state: bool,

    /// Answer /events with an empty list instead of 503 when the provider fails
    #[arg(long, env = "EVENTS_EMPTY_ON_ERROR", default_value_t = false, action = ArgAction::Set)]
    pub empty_on_provider_error: bool,

    /// Enable debug output
    #[arg(long, short = 'v', env = "CALGATE_DEBUG")]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "CALGATE_JSON_LOGS")]
    pub json_logs: bool,
}

impl std::fmt::Debug for ServerArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerArgs")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("callback_url", &self.callback_url)
            .field("session_secret", &"<redacted>")
            .field("bind", &self.bind)
            .field("events_limit", &self.events_limit)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .field("verify_state", &self.verify_state)
            .field("empty_on_provider_error", &self.empty_on_provider_error)
            .field("debug", &self.debug)
            .field("json_logs", &self.json_logs)
            .finish()
    }
}

impl ServerArgs {
    /// Tracing setup matching the `--debug` and `--json-logs` flags.
    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig::from_flags(self.debug, self.json_logs)
    }

    /// Validates the arguments and splits off the session secret.
    pub fn into_config(self) -> ServerResult<(ServerConfig, String)> {
        if self.session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ServerError::config(format!(
                "session secret must be at least {} bytes",
                MIN_SESSION_SECRET_LEN
            )));
        }

        let client = ClientConfig::new(
            OAuthCredentials::new(self.client_id, self.client_secret),
            self.callback_url,
        )
        .with_timeout(Duration::from_secs(self.provider_timeout_secs));

        let config = ServerConfig::new(client)
            .with_bind(self.bind)
            .with_events_limit(self.events_limit)
            .with_verify_state(self.verify_state)
            .with_empty_on_provider_error(self.empty_on_provider_error);
        config.validate()?;

        Ok((config, self.session_secret))
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Provider client settings.
    pub client: ClientConfig,

    /// Address to listen on.
    pub bind: SocketAddr,

    /// Maximum number of events returned by `/events`.
    pub events_limit: usize,

    /// Whether `/callback` checks the state parameter.
    pub verify_state: bool,

    /// Whether provider failures on `/events` yield `[]` instead of 503.
    pub empty_on_provider_error: bool,
}

impl ServerConfig {
    /// Default number of events returned by `/events`.
    pub const DEFAULT_EVENTS_LIMIT: usize = 20;

    /// Default listen address.
    pub const DEFAULT_BIND: ([u8; 4], u16) = ([127, 0, 0, 1], 5000);

    /// Creates a configuration with default server settings.
    pub fn new(client: ClientConfig) -> Self {
        Self {
            client,
            bind: SocketAddr::from(Self::DEFAULT_BIND),
            events_limit: Self::DEFAULT_EVENTS_LIMIT,
            verify_state: true,
            empty_on_provider_error: false,
        }
    }

    /// Builder: set listen address.
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// Builder: set events limit.
    pub fn with_events_limit(mut self, limit: usize) -> Self {
        self.events_limit = limit;
        self
    }

    /// Builder: set state verification.
    pub fn with_verify_state(mut self, verify: bool) -> Self {
        self.verify_state = verify;
        self
    }

    /// Builder: set the legacy empty-list behavior.
    pub fn with_empty_on_provider_error(mut self, empty: bool) -> Self {
        self.empty_on_provider_error = empty;
        self
    }

    /// The redirect URI sent to the provider.
    pub fn redirect_uri(&self) -> &str {
        &self.client.redirect_uri
    }

    /// Cookies get the `Secure` attribute when the service is reached over
    /// HTTPS.
    pub fn secure_cookies(&self) -> bool {
        self.client.redirect_uri.starts_with("https://")
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ServerResult<()> {
        self.client.validate().map_err(ServerError::config)
    }
}
