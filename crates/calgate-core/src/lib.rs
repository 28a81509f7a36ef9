//! Core types: credential payloads, event shapes, tracing setup

pub mod credentials;
pub mod event;
pub mod time;
pub mod tracing;

pub use credentials::{CredentialPayload, PayloadError};
pub use event::SerializedEvent;
pub use time::{EventStart, TimeParseError};
pub use crate::tracing::{TracingConfig, TracingError, init_tracing};
