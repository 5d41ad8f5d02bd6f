//! Credential primitives: password hashing and device API-key generation.
//!
//! Passwords are stored as Argon2id PHC strings. Bcrypt hashes written by
//! earlier deployments still verify and are upgraded on the next login. A
//! legacy plaintext comparison exists for databases seeded before hashing was
//! introduced; it only runs when explicitly enabled and always compares in
//! constant time.

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Number of random bytes in a device API key.
const API_KEY_BYTES: usize = 32;

const ARGON2_PREFIX: &str = "$argon2";

/// Modular-crypt prefixes of bcrypt hashes.
const BCRYPT_PREFIXES: &[&str] = &["$2a$", "$2b$", "$2x$", "$2y$"];

/// Crypto error types
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("password hashing failed: {0}")]
    HashingFailed(String),
}

/// Result of checking a password against a stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    /// Matched a salted hash.
    Verified,
    /// Matched a bcrypt hash; the stored value should be re-hashed with Argon2id.
    VerifiedUpgradable,
    /// Matched through the plaintext fallback; the stored value should be re-hashed.
    VerifiedLegacy,
    Rejected,
}

impl PasswordCheck {
    pub fn is_match(self) -> bool {
        !matches!(self, PasswordCheck::Rejected)
    }

    /// True when the stored credential matched but is not an Argon2id hash.
    pub fn needs_rehash(self) -> bool {
        matches!(
            self,
            PasswordCheck::VerifiedUpgradable | PasswordCheck::VerifiedLegacy
        )
    }
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, CryptoError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CryptoError::HashingFailed(e.to_string()))
}

/// True when the stored value looks like a salted hash rather than plaintext.
pub fn looks_like_hash(stored: &str) -> bool {
    stored.starts_with(ARGON2_PREFIX) || is_bcrypt(stored)
}

fn is_bcrypt(stored: &str) -> bool {
    BCRYPT_PREFIXES
        .iter()
        .any(|prefix| stored.starts_with(prefix))
}

/// Check `password` against the stored credential.
///
/// Hash parse or verification errors count as a mismatch. Values that do not
/// look like a hash are compared as plaintext only if `allow_plaintext` is set.
pub fn verify_password(password: &str, stored: &str, allow_plaintext: bool) -> PasswordCheck {
    if is_bcrypt(stored) {
        return match bcrypt::verify(password, stored) {
            Ok(true) => PasswordCheck::VerifiedUpgradable,
            _ => PasswordCheck::Rejected,
        };
    }

    if stored.starts_with(ARGON2_PREFIX) {
        let verified = PasswordHash::new(stored)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false);

        return if verified {
            PasswordCheck::Verified
        } else {
            PasswordCheck::Rejected
        };
    }

    if allow_plaintext && bool::from(password.as_bytes().ct_eq(stored.as_bytes())) {
        tracing::warn!("Password accepted through the legacy plaintext fallback");
        return PasswordCheck::VerifiedLegacy;
    }

    PasswordCheck::Rejected
}

/// Generate a fresh device API key: 32 OS-random bytes, URL-safe base64 without padding.
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; API_KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
