//! Shared application state.

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use calgate_providers::{CalendarProvider, CredentialManager, EventFacade};

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::session::session_key;

/// Immutable state shared by every request.
///
/// Cloning is cheap; all credential state lives in the browser's cookies.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ServerConfig>,
    key: Key,
    facade: EventFacade,
}

impl AppState {
    /// Builds the state for `config`, deriving the cookie key from
    /// `session_secret`.
    pub fn new(
        config: ServerConfig,
        session_secret: &str,
        provider: Arc<dyn CalendarProvider>,
    ) -> ServerResult<Self> {
        let key = session_key(session_secret)?;
        let manager = CredentialManager::new(config.client.clone(), provider);
        Ok(Self {
            config: Arc::new(config),
            key,
            facade: EventFacade::new(manager),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn manager(&self) -> &CredentialManager {
        self.facade.manager()
    }

    pub fn facade(&self) -> &EventFacade {
        &self.facade
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}
