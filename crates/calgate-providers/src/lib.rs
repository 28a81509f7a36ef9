//! Calendar provider seam, Google implementation, and the credential logic
//! built on top of it.
//!
//! - [`CalendarProvider`] - the three network operations the service needs
//! - [`GoogleProvider`] - Google OAuth + Calendar v3 implementation
//! - [`CredentialManager`] - authorization URLs, code exchange, token refresh
//! - [`EventFacade`] - upcoming events for a credential payload
//!
//! # Architecture
//!
//! ```text
//!   /auth, /callback           /events
//!          │                      │
//!          ▼                      ▼
//! ┌───────────────────┐   ┌───────────────┐
//! │ CredentialManager │◄──│  EventFacade  │
//! └─────────┬─────────┘   └───────┬───────┘
//!           │   CalendarProvider  │
//!           └──────────┬──────────┘
//!                      ▼
//!          ┌───────────────────────┐
//!          │ GoogleProvider / Fake │
//!          └───────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod facade;
pub mod fake;
pub mod google;
pub mod manager;
pub mod pkce;
pub mod provider;
pub mod raw_event;

pub use config::{ClientConfig, Endpoints, OAuthCredentials};
pub use error::{
    CredentialError, CredentialResult, ProviderError, ProviderErrorCode, ProviderResult,
};
pub use facade::{EventFacade, UpcomingEvents};
pub use fake::FakeProvider;
pub use google::GoogleProvider;
pub use manager::{CredentialManager, authorization_url};
pub use pkce::PendingAuthorization;
pub use provider::{BoxFuture, CalendarProvider, CodeExchange, EventQuery, TokenGrant};
pub use raw_event::{RawEvent, RawEventTime};
