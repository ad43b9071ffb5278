//! # Vault Sealing
//!
//! ChaCha20-Poly1305 AEAD over vault item payloads. A single 32-byte
//! master key is configured for the process; each owner's content key is
//! derived from it with a domain-separated SHA-256, so one user's
//! ciphertexts are useless against another's even if the store leaks.
//!
//! Sealed payloads are stored as versioned envelope strings:
//!
//! ```text
//! enc:v1:<nonce_b64>:<ciphertext_b64>
//! ```
//!
//! Base64 segments use the URL-safe alphabet without padding. The `v1`
//! version tag allows a future algorithm migration to coexist with old
//! rows. Decryption treats every failure mode identically — a malformed
//! envelope yields [`CryptoError::MalformedEnvelope`] with a structural
//! reason, but any cryptographic failure is the opaque
//! [`CryptoError::DecryptionFailed`].

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, OsRng};
use chacha20poly1305::{AeadCore, ChaCha20Poly1305, KeyInit, Nonce};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use vigil_core::UserId;

use crate::error::CryptoError;

/// Version prefix on every sealed payload.
pub const ENVELOPE_PREFIX: &str = "enc:v1:";

/// Domain-separation tag for per-owner key derivation.
const KEY_DERIVATION_TAG: &[u8] = b"vigil/vault-key/v1";

/// AEAD nonce length in bytes (ChaCha20-Poly1305).
const NONCE_LEN: usize = 12;

// ---------------------------------------------------------------------------
// VaultCipher
// ---------------------------------------------------------------------------

/// Seals and opens vault payloads for any owner, holding the master key.
///
/// The master key is zeroized when the cipher is dropped. Derived per-owner
/// keys are zeroized after each operation.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct VaultCipher {
    master_key: [u8; 32],
}

impl std::fmt::Debug for VaultCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("VaultCipher").finish_non_exhaustive()
    }
}

impl VaultCipher {
    /// Build a cipher from a 64-character hex master key.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let master_key = hex_to_32bytes(hex)?;
        Ok(Self { master_key })
    }

    /// Build a cipher from raw key bytes.
    pub fn from_bytes(master_key: [u8; 32]) -> Self {
        Self { master_key }
    }

    /// Build a cipher with a freshly generated random master key.
    ///
    /// Envelopes sealed under an ephemeral key cannot be opened after a
    /// restart; this exists for development and tests only.
    pub fn ephemeral() -> Self {
        use rand_core::{OsRng as RandOsRng, RngCore};
        let mut master_key = [0u8; 32];
        RandOsRng.fill_bytes(&mut master_key);
        Self { master_key }
    }

    /// Seal a plaintext for `owner`, producing an `enc:v1:` envelope string.
    pub fn encrypt(&self, owner: UserId, plaintext: &[u8]) -> Result<String, CryptoError> {
        let mut key = self.owner_key(owner);
        let cipher = ChaCha20Poly1305::new_from_slice(&key)
            .map_err(|_| CryptoError::EncryptionFailed)?;
        key.zeroize();

        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        Ok(format!(
            "{ENVELOPE_PREFIX}{}:{}",
            URL_SAFE_NO_PAD.encode(nonce),
            URL_SAFE_NO_PAD.encode(&ciphertext)
        ))
    }

    /// Open an `enc:v1:` envelope string sealed for `owner`.
    pub fn decrypt(&self, owner: UserId, envelope: &str) -> Result<Vec<u8>, CryptoError> {
        let parsed = Envelope::parse(envelope)?;

        let mut key = self.owner_key(owner);
        let cipher = ChaCha20Poly1305::new_from_slice(&key)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        key.zeroize();

        cipher
            .decrypt(Nonce::from_slice(&parsed.nonce), parsed.ciphertext.as_ref())
            .map_err(|_| CryptoError::DecryptionFailed)
    }

    /// Derive the content key for one owner:
    /// `SHA-256(tag || master_key || owner_uuid)`.
    fn owner_key(&self, owner: UserId) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(KEY_DERIVATION_TAG);
        hasher.update(self.master_key);
        hasher.update(owner.as_uuid().as_bytes());
        hasher.finalize().into()
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A parsed `enc:v1:` envelope: nonce and ciphertext, both raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Parse and structurally validate an envelope string.
    pub fn parse(s: &str) -> Result<Self, CryptoError> {
        let body = s
            .strip_prefix(ENVELOPE_PREFIX)
            .ok_or(CryptoError::MalformedEnvelope("missing enc:v1: prefix"))?;

        let (nonce_b64, ct_b64) = body
            .split_once(':')
            .ok_or(CryptoError::MalformedEnvelope("missing nonce segment"))?;

        let nonce = URL_SAFE_NO_PAD
            .decode(nonce_b64)
            .map_err(|_| CryptoError::MalformedEnvelope("nonce is not valid base64"))?;
        if nonce.len() != NONCE_LEN {
            return Err(CryptoError::MalformedEnvelope("nonce has wrong length"));
        }

        let ciphertext = URL_SAFE_NO_PAD
            .decode(ct_b64)
            .map_err(|_| CryptoError::MalformedEnvelope("ciphertext is not valid base64"))?;

        Ok(Self { nonce, ciphertext })
    }
}

/// Decode a 64-char hex string to 32 bytes.
fn hex_to_32bytes(hex: &str) -> Result<[u8; 32], CryptoError> {
    let hex = hex.trim();
    if hex.len() != 64 {
        return Err(CryptoError::InvalidMasterKey(hex.len()));
    }
    let mut out = [0u8; 32];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let s = std::str::from_utf8(chunk).map_err(|_| CryptoError::InvalidMasterKey(hex.len()))?;
        out[i] =
            u8::from_str_radix(s, 16).map_err(|_| CryptoError::InvalidMasterKey(hex.len()))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_cipher() -> VaultCipher {
        VaultCipher::from_bytes([7u8; 32])
    }

    #[test]
    fn from_hex_accepts_64_chars() {
        let cipher = VaultCipher::from_hex(&"ab".repeat(32)).unwrap();
        assert_eq!(cipher.master_key, [0xab; 32]);
    }

    #[test]
    fn from_hex_rejects_wrong_length_and_non_hex() {
        assert!(matches!(
            VaultCipher::from_hex("abcd"),
            Err(CryptoError::InvalidMasterKey(4))
        ));
        assert!(VaultCipher::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn encrypt_produces_versioned_envelope() {
        let owner = UserId::new();
        let sealed = test_cipher().encrypt(owner, b"dear daughter").unwrap();
        assert!(sealed.starts_with(ENVELOPE_PREFIX));
        assert_eq!(sealed.matches(':').count(), 3);
    }

    #[test]
    fn decrypt_recovers_plaintext() {
        let cipher = test_cipher();
        let owner = UserId::new();
        let sealed = cipher.encrypt(owner, b"the safe code is 4417").unwrap();
        let opened = cipher.decrypt(owner, &sealed).unwrap();
        assert_eq!(opened, b"the safe code is 4417");
    }

    #[test]
    fn wrong_owner_cannot_decrypt() {
        let cipher = test_cipher();
        let sealed = cipher.encrypt(UserId::new(), b"secret").unwrap();
        assert!(matches!(
            cipher.decrypt(UserId::new(), &sealed),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn wrong_master_key_cannot_decrypt() {
        let owner = UserId::new();
        let sealed = test_cipher().encrypt(owner, b"secret").unwrap();
        let other = VaultCipher::from_bytes([8u8; 32]);
        assert!(matches!(
            other.decrypt(owner, &sealed),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let cipher = test_cipher();
        let owner = UserId::new();
        let sealed = cipher.encrypt(owner, b"secret").unwrap();
        // Flip a character in the ciphertext segment.
        let mut bytes = sealed.into_bytes();
        let last = bytes.len() - 1;
        bytes[last] = if bytes[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();
        assert!(cipher.decrypt(owner, &tampered).is_err());
    }

    #[test]
    fn malformed_envelopes_are_structural_errors() {
        let cipher = test_cipher();
        let owner = UserId::new();
        for bad in ["plaintext", "enc:v2:aaaa:bbbb", "enc:v1:nopadd", "enc:v1:!!:??"] {
            assert!(matches!(
                cipher.decrypt(owner, bad),
                Err(CryptoError::MalformedEnvelope(_))
            ));
        }
    }

    #[test]
    fn envelope_parse_rejects_short_nonce() {
        let short = format!("enc:v1:{}:{}", URL_SAFE_NO_PAD.encode([0u8; 4]), "AAAA");
        assert!(matches!(
            Envelope::parse(&short),
            Err(CryptoError::MalformedEnvelope("nonce has wrong length"))
        ));
    }

    #[test]
    fn nonces_are_fresh_per_encryption() {
        let cipher = test_cipher();
        let owner = UserId::new();
        let a = cipher.encrypt(owner, b"same plaintext").unwrap();
        let b = cipher.encrypt(owner, b"same plaintext").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn debug_does_not_leak_key() {
        let debug = format!("{:?}", test_cipher());
        assert!(!debug.contains('7'));
    }

    proptest! {
        /// Any payload round-trips through seal and open for its owner.
        #[test]
        fn seal_open_round_trip(payload in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let cipher = test_cipher();
            let owner = UserId::new();
            let sealed = cipher.encrypt(owner, &payload).unwrap();
            prop_assert_eq!(cipher.decrypt(owner, &sealed).unwrap(), payload);
        }
    }
}
