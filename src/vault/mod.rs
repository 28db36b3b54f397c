//! Symmetric encryption for secrets held at rest.
//!
//! Bearer tokens, OAuth client secrets and issued OAuth tokens are stored as
//! [`EncryptedSecret`] values. Each value is the base64 encoding of a random
//! 12-byte nonce followed by the `ChaCha20-Poly1305` ciphertext. The key is
//! process-wide and read once at startup.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit},
};
use rand::RngExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Environment variable holding the base64-encoded vault key.
pub const VAULT_KEY_ENV: &str = "SWITCHBOARD_VAULT_KEY";

const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;

/// Errors raised while loading the vault key or handling ciphertext.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// The vault key is not configured.
    #[error("vault key is not configured (set {VAULT_KEY_ENV})")]
    MissingKey,

    /// The vault key is not valid base64 or has the wrong length.
    #[error("vault key must be {KEY_LENGTH} bytes encoded as base64")]
    InvalidKey,

    /// The ciphertext is not valid base64 or is too short to hold a nonce.
    #[error("stored credential is malformed")]
    MalformedCiphertext,

    /// Authentication of the ciphertext failed, usually a foreign key.
    #[error("stored credential could not be decrypted")]
    DecryptionFailed,

    /// Encryption failed inside the cipher.
    #[error("credential could not be encrypted")]
    EncryptionFailed,

    /// The decrypted bytes are not UTF-8.
    #[error("decrypted credential is not valid UTF-8")]
    InvalidUtf8,
}

/// A 256-bit vault key.
#[derive(Clone)]
pub struct VaultKey([u8; KEY_LENGTH]);

impl VaultKey {
    /// Builds a key from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Decodes a base64 key.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::InvalidKey`] when the value does not decode
    /// to exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, CredentialError> {
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|_| CredentialError::InvalidKey)?;
        let bytes: [u8; KEY_LENGTH] = decoded
            .try_into()
            .map_err(|_| CredentialError::InvalidKey)?;
        Ok(Self(bytes))
    }

    /// Generates a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0_u8; KEY_LENGTH];
        rand::rng().fill(&mut bytes);
        Self(bytes)
    }

    /// Returns the key encoded as base64.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("VaultKey(..)")
    }
}

/// Ciphertext produced by [`CredentialVault::encrypt`].
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedSecret(String);

impl EncryptedSecret {
    /// Wraps ciphertext loaded from storage.
    #[must_use]
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the storage representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EncryptedSecret {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "EncryptedSecret({} bytes)", self.0.len())
    }
}

/// Encrypts and decrypts secrets with the process-wide key.
#[derive(Clone)]
pub struct CredentialVault {
    cipher: ChaCha20Poly1305,
}

impl CredentialVault {
    /// Creates a vault from a key.
    #[must_use]
    pub fn new(key: &VaultKey) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key.0)),
        }
    }

    /// Creates a vault from the [`VAULT_KEY_ENV`] environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::MissingKey`] when the variable is unset and
    /// [`CredentialError::InvalidKey`] when it cannot be decoded.
    pub fn from_env() -> Result<Self, CredentialError> {
        let encoded = std::env::var(VAULT_KEY_ENV).map_err(|_| CredentialError::MissingKey)?;
        let key = VaultKey::from_base64(&encoded)?;
        Ok(Self::new(&key))
    }

    /// Encrypts a secret.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::EncryptionFailed`] when the cipher rejects
    /// the input.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedSecret, CredentialError> {
        let mut nonce_bytes = [0_u8; NONCE_LENGTH];
        rand::rng().fill(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CredentialError::EncryptionFailed)?;

        let mut payload = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend(ciphertext);
        Ok(EncryptedSecret(STANDARD.encode(payload)))
    }

    /// Encrypts an optional secret; `None` stays `None`.
    ///
    /// # Errors
    ///
    /// Propagates [`CredentialVault::encrypt`] failures.
    pub fn encrypt_optional(
        &self,
        plaintext: Option<&str>,
    ) -> Result<Option<EncryptedSecret>, CredentialError> {
        plaintext.map(|value| self.encrypt(value)).transpose()
    }

    /// Decrypts a secret.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::MalformedCiphertext`] for values that were
    /// not produced by a vault, and [`CredentialError::DecryptionFailed`] for
    /// values produced under another key.
    pub fn decrypt(&self, secret: &EncryptedSecret) -> Result<String, CredentialError> {
        let payload = STANDARD
            .decode(secret.as_str())
            .map_err(|_| CredentialError::MalformedCiphertext)?;
        if payload.len() <= NONCE_LENGTH {
            return Err(CredentialError::MalformedCiphertext);
        }

        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LENGTH);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CredentialError::DecryptionFailed)?;
        String::from_utf8(plaintext).map_err(|_| CredentialError::InvalidUtf8)
    }

    /// Decrypts an optional secret; `None` stays `None`.
    ///
    /// # Errors
    ///
    /// Propagates [`CredentialVault::decrypt`] failures.
    pub fn decrypt_optional(
        &self,
        secret: Option<&EncryptedSecret>,
    ) -> Result<Option<String>, CredentialError> {
        secret.map(|value| self.decrypt(value)).transpose()
    }
}

impl fmt::Debug for CredentialVault {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("CredentialVault(..)")
    }
}
