//! # Cryptographic Error Types
//!
//! Structured errors for all cryptographic operations in `vigil-crypto`.
//! Uses `thiserror` for ergonomic error definitions with diagnostic context.
//!
//! Decryption failures deliberately carry no distinguishing detail: a bad
//! tag, a truncated envelope body, and a wrong key all surface as
//! [`CryptoError::DecryptionFailed`] so callers cannot oracle the cause.

use thiserror::Error;

/// Errors from cryptographic operations in Vigil.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The master key was not 32 bytes of valid hex.
    #[error("invalid master key: expected 64 hex characters, got {0}")]
    InvalidMasterKey(usize),

    /// A stored ciphertext envelope did not match the `enc:v1:` layout.
    #[error("malformed ciphertext envelope: {0}")]
    MalformedEnvelope(&'static str),

    /// AEAD decryption failed (wrong key, tampered ciphertext, or bad tag).
    #[error("decryption failed")]
    DecryptionFailed,

    /// AEAD encryption failed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Password hashing or verification failed internally.
    #[error("password hashing error: {0}")]
    PasswordHash(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_master_key_names_length() {
        let err = CryptoError::InvalidMasterKey(10);
        let msg = format!("{err}");
        assert!(msg.contains("64 hex"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn malformed_envelope_names_reason() {
        let err = CryptoError::MalformedEnvelope("missing nonce segment");
        assert!(format!("{err}").contains("missing nonce segment"));
    }

    #[test]
    fn decryption_failure_reveals_nothing() {
        let msg = format!("{}", CryptoError::DecryptionFailed);
        assert_eq!(msg, "decryption failed");
    }
}
