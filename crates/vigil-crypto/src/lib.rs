//! # vigil-crypto — Cryptographic Primitives for Vigil
//!
//! This crate provides the cryptographic building blocks used throughout
//! the workspace:
//!
//! - **Vault sealing** ([`cipher`]): ChaCha20-Poly1305 AEAD over vault item
//!   payloads, with a per-owner content key derived from a single master
//!   key, serialized as a versioned `enc:v1:` envelope string.
//! - **Password hashing** ([`password`]): Argon2id for user credentials.
//! - **Token utilities** ([`token`]): URL-safe random tokens and
//!   constant-time comparison for verification links.
//!
//! ## Crate Policy
//!
//! No I/O and no async. Key material is zeroized on drop; decryption
//! failures carry no plaintext-derived detail.

pub mod cipher;
pub mod error;
pub mod password;
pub mod token;

// Re-export primary types.
pub use cipher::{Envelope, VaultCipher, ENVELOPE_PREFIX};
pub use error::CryptoError;
pub use password::{hash_password, verify_password};
pub use token::{constant_time_eq, generate_token};
