//! Google Calendar provider implementation.
//!
//! [`GoogleProvider`] talks to two Google services:
//!
//! - the OAuth 2.0 token endpoint, for code exchange and token refresh
//! - the Calendar API v3, for listing events
//!
//! Endpoints come from [`ClientConfig`](crate::config::ClientConfig) so tests
//! can point the provider at a local fake.
//!
//! # Example
//!
//! ```ignore
//! use calgate_providers::{ClientConfig, OAuthCredentials, GoogleProvider};
//!
//! let credentials = OAuthCredentials::new(
//!     "your-client-id.apps.googleusercontent.com",
//!     "your-client-secret",
//! );
//! let config = ClientConfig::new(credentials, "http://localhost:5000/callback");
//! let provider = GoogleProvider::new(&config)?;
//! ```

mod client;
mod oauth;
mod provider;

pub use client::GoogleCalendarClient;
pub use oauth::OAuthClient;
pub use provider::GoogleProvider;
