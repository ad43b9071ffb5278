//! # Password Hashing
//!
//! Argon2id with default parameters and a per-hash random salt, encoded in
//! PHC string format. Verification failures and storage corruption both
//! report as a plain boolean mismatch; internal errors (a corrupt PHC
//! string) surface as [`CryptoError::PasswordHash`].

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::CryptoError;

/// Hash a password into a PHC-format string for storage.
pub fn hash_password(password: &str) -> Result<String, CryptoError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| CryptoError::PasswordHash(e.to_string()))
}

/// Check a candidate password against a stored PHC string.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, CryptoError> {
    let parsed =
        PasswordHash::new(stored).map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
