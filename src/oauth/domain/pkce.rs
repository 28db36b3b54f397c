//! PKCE (RFC 7636) verifier and S256 challenge generation.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngExt;
use sha2::{Digest, Sha256};
use std::fmt;

/// The only challenge method this crate issues.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

const VERIFIER_ENTROPY_BYTES: usize = 32;
const STATE_ENTROPY_BYTES: usize = 32;

/// A code verifier paired with its S256 challenge.
#[derive(Clone, PartialEq, Eq)]
pub struct PkcePair {
    verifier: String,
    challenge: String,
}

impl PkcePair {
    /// Generates a fresh verifier of 43 URL-safe characters.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0_u8; VERIFIER_ENTROPY_BYTES];
        rand::rng().fill(&mut bytes);
        Self::from_verifier(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Derives the challenge for an existing verifier.
    #[must_use]
    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let owned = verifier.into();
        let challenge = challenge_for(&owned);
        Self {
            verifier: owned,
            challenge,
        }
    }

    /// Returns the secret verifier.
    #[must_use]
    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    /// Returns the public challenge.
    #[must_use]
    pub fn challenge(&self) -> &str {
        &self.challenge
    }
}

impl fmt::Debug for PkcePair {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PkcePair")
            .field("challenge", &self.challenge)
            .finish_non_exhaustive()
    }
}

/// Computes `BASE64URL(SHA256(verifier))` without padding.
#[must_use]
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Generates an opaque, unguessable `state` parameter.
#[must_use]
pub fn generate_state_token() -> String {
    let mut bytes = [0_u8; STATE_ENTROPY_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
