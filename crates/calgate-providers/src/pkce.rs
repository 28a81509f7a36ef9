//! Anti-forgery state and PKCE verifier for one authorization attempt.
//!
//! Implements RFC 7636 (Proof Key for Code Exchange). A
//! [`PendingAuthorization`] is created when the user is sent to the consent
//! screen and checked when the provider redirects back.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// The state token length (in bytes, before base64 encoding).
const STATE_LENGTH: usize = 16;

/// State kept between the redirect to the consent screen and the callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuthorization {
    /// Random state echoed back by the provider.
    pub state: String,
    /// The code verifier (high-entropy random string).
    pub verifier: String,
}

impl PendingAuthorization {
    /// Creates a new pending authorization with random state and verifier.
    pub fn new() -> Self {
        Self {
            state: random_token(STATE_LENGTH),
            verifier: random_token(CODE_VERIFIER_LENGTH),
        }
    }

    /// The code challenge (SHA-256 of the verifier, base64url encoded).
    pub fn challenge(&self) -> String {
        compute_challenge(&self.verifier)
    }

    /// Returns true if `received` is the state this attempt was issued with.
    pub fn state_matches(&self, received: Option<&str>) -> bool {
        received.is_some_and(|s| constant_time_eq(s.as_bytes(), self.state.as_bytes()))
    }
}

impl Default for PendingAuthorization {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

fn compute_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
