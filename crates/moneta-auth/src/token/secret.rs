//! Opaque refresh secrets and their storage hashes.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Bytes of entropy in a generated secret (256 bits).
const SECRET_BYTES: usize = 32;

/// Generate a random opaque token string (base64url, no padding).
pub fn generate_opaque_token() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// An opaque refresh-token secret.
///
/// The plaintext is a bearer credential: it is handed to the client exactly
/// once and only its SHA-256 digest is ever persisted, so a database dump
/// cannot be replayed as a valid token. `Debug` output is redacted and the
/// type implements neither `Display` nor `Serialize`; reaching the
/// plaintext requires an explicit [`RefreshSecret::expose`].
#[derive(Clone)]
pub struct RefreshSecret(String);

impl RefreshSecret {
    /// Generate a fresh secret together with its lookup hash.
    pub fn generate() -> (Self, String) {
        let secret = Self(generate_opaque_token());
        let hash = secret.lookup_hash();
        (secret, hash)
    }

    /// Wrap a client-presented value for hashing and lookup.
    pub fn from_presented(value: &str) -> Self {
        Self(value.to_string())
    }

    /// The deterministic one-way digest used as the storage key.
    pub fn lookup_hash(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    /// Access the plaintext. Callers must treat it as a bearer credential:
    /// never log it and never echo it in error messages.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the plaintext for transport.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for RefreshSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RefreshSecret(****)")
    }
}
