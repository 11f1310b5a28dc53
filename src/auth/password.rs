//! Credential verifier over Argon2id.
//!
//! The hash primitive stays behind this wrapper so the resolver treats it
//! as an opaque one-way verify/hash capability.

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier as _,
};
use anyhow::{anyhow, Result};

#[derive(Debug, Default, Clone, Copy)]
pub struct PasswordVerifier;

impl PasswordVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Hash a plaintext password into a storable digest.
    ///
    /// # Errors
    ///
    /// Returns an error if the hashing primitive itself fails.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(rand::thread_rng());
        let digest = Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|err| anyhow!("failed to hash password: {err}"))?;
        Ok(digest.to_string())
    }

    /// Verify a plaintext password against a stored digest.
    ///
    /// Never errors: a malformed digest verifies as `false`.
    #[must_use]
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}
