//! # Verification Tokens
//!
//! URL-safe random tokens for trusted-contact verification links, plus a
//! constant-time comparison so token checks cannot be timed.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand_core::{OsRng, RngCore};
use subtle::ConstantTimeEq;

/// Entropy per token, in bytes (32 bytes → 43 URL-safe characters).
const TOKEN_BYTES: usize = 32;

/// Generate a fresh URL-safe verification token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare two tokens without leaking a timing signal.
///
/// Length mismatch short-circuits; the length of a stored token is not
/// secret, only its content.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
