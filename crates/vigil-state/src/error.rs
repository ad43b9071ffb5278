//! # Store Error Types
//!
//! Shared error enum for every store in this crate. The API layer maps
//! these onto HTTP statuses; the variants are chosen to make that mapping
//! unambiguous (NotFound → 404, AlreadyInProgress → 409, and so on).

use thiserror::Error;

use vigil_core::ValidationError;
use vigil_crypto::CryptoError;

/// Errors from domain store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The named entity does not exist under the requesting owner.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Input validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A release is already pending or in progress for this owner.
    #[error("a release is already pending or in progress for this user")]
    AlreadyInProgress,

    /// A release record was asked to make an illegal state transition.
    #[error("illegal release transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    /// The obligation has already been settled.
    #[error("obligation is already settled")]
    AlreadySettled,

    /// An account already exists for this email address.
    #[error("email is already registered")]
    EmailTaken,

    /// The entity already exists and cannot be created twice.
    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    /// Vault cryptography failed. Encryption errors surface at write time;
    /// decryption errors are fatal to a whole release batch.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
