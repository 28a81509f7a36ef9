//! Server error types.

use std::io;
use std::net::SocketAddr;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use calgate_core::PayloadError;
use calgate_providers::{CredentialError, ProviderError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error while serving.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A `.env` file exists but could not be read or parsed.
    #[error("failed to load .env file: {0}")]
    EnvFile(#[source] dotenvy::Error),

    /// The provider could not be set up.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a bind error.
    pub fn bind(addr: SocketAddr, source: io::Error) -> Self {
        Self::Bind { addr, source }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// An error returned from a route handler.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// 400 for malformed or forged callbacks.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    /// 500; the message is logged but not sent to the client.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        let status = match err {
            CredentialError::ProviderQuery(_) => StatusCode::SERVICE_UNAVAILABLE,
            CredentialError::CredentialExpired { .. } => StatusCode::UNAUTHORIZED,
            CredentialError::AuthExchange(_) => StatusCode::BAD_GATEWAY,
        };
        let message = match err {
            CredentialError::ProviderQuery(_) => {
                "calendar provider is temporarily unavailable".to_string()
            }
            ref other => other.to_string(),
        };
        Self::new(status, err.as_str(), message)
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<PayloadError> for AppError {
    fn from(err: PayloadError) -> Self {
        Self::internal(format!("failed to encode session: {}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error = if self.status.is_server_error() && self.status != StatusCode::SERVICE_UNAVAILABLE {
            error!(code = self.code, "{}", self.message);
            "internal server error".to_string()
        } else {
            self.message
        };

        let body = Json(ErrorResponse {
            error,
            code: self.code,
        });
        (self.status, body).into_response()
    }
}
