//! Cryptographic primitives consumed by the envelope verifier.
//!
//! This module covers the full primitive surface the verification pipeline
//! relies on:
//!
//! - SHA-256 with lowercase hex output,
//! - constant-time byte and string comparison,
//! - ECDSA/P-256 verification over raw `r || s` signatures,
//! - P-256 public key decoding from base64 SEC1 bytes.
//!
//! Signatures are the raw concatenation `r || s`, each component left-zero-padded
//! to 32 bytes (64 bytes total once base64 is stripped). DER-encoded signatures
//! are not accepted: a decoded length other than 64 fails verification without
//! raising.

use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use serde::{Deserialize, Deserializer};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;

use crate::util::b64;

/// Length of a raw P-256 signature: 32 bytes of `r` followed by 32 bytes of `s`.
const RAW_SIGNATURE_LEN: usize = 64;

/// Compute the SHA-256 digest of `bytes` as a lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)
}

/// Compare two byte slices in time independent of the first differing position.
///
/// On length mismatch the function performs a dummy comparison of equal cost to
/// the same-length path before returning `false`, so that rejection timing does
/// not reveal where the inputs diverge.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        let _ = a.ct_eq(a);
        return false;
    }
    a.ct_eq(b).into()
}

/// Constant-time equality over the UTF-8 bytes of two strings.
pub fn constant_time_eq_str(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

/// Scan `haystack` for `needle` using constant-time comparison and no early exit.
///
/// The scan visits every element and folds matches into a flag instead of
/// returning on the first hit, so timing does not disclose which position
/// carried the match.
pub fn contains_constant_time(haystack: &[String], needle: &str) -> bool {
    let mut found = false;
    for candidate in haystack {
        found |= constant_time_eq_str(candidate, needle);
    }
    found
}

/// Verify a raw `r || s` P-256 signature over `message` under `public_key`.
///
/// `signature_base64` is decoded with the standard padded alphabet. Any decode
/// failure, a decoded length other than 64 bytes, or an `r`/`s` pair outside
/// the valid scalar range yields `false`; this function never errors.
///
/// The message is hashed with SHA-256 as part of verification, matching how the
/// platform signs envelope payloads and rules containers.
pub fn verify_p256_signature(
    public_key: &VerifyingKey,
    message: &[u8],
    signature_base64: &str,
) -> bool {
    let raw = match b64::decode(signature_base64) {
        Ok(raw) => raw,
        Err(_) => return false,
    };
    if raw.len() != RAW_SIGNATURE_LEN {
        return false;
    }
    let signature = match Signature::from_slice(&raw) {
        Ok(signature) => signature,
        Err(_) => return false,
    };
    public_key.verify(message, &signature).is_ok()
}

/// A decoded P-256 public key as found in the governance rules container.
///
/// Keys arrive base64-encoded in SEC1 form (compressed or uncompressed).
/// Decoding rejects points that are not on the P-256 curve, so a key of any
/// other curve fails at container decode time rather than during verification.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct P256PublicKey(VerifyingKey);

impl P256PublicKey {
    /// Decode a base64 SEC1 public key.
    pub fn from_base64(encoded: &str) -> Result<Self, PublicKeyError> {
        if encoded.is_empty() {
            return Err(PublicKeyError::Empty);
        }
        let bytes = b64::decode(encoded).map_err(PublicKeyError::Base64)?;
        let key = VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| PublicKeyError::NotP256)?;
        Ok(P256PublicKey(key))
    }

    /// The underlying verifying key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.0
    }
}

impl From<VerifyingKey> for P256PublicKey {
    fn from(key: VerifyingKey) -> Self {
        P256PublicKey(key)
    }
}

impl fmt::Debug for P256PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Render the compressed point, not the internal representation.
        f.debug_tuple("P256PublicKey")
            .field(&hex::encode(self.0.to_encoded_point(true).as_bytes()))
            .finish()
    }
}

impl<'de> Deserialize<'de> for P256PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        P256PublicKey::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

/// Failure to decode a public key from its container representation.
#[derive(Debug, thiserror::Error)]
pub enum PublicKeyError {
    /// The encoded key was the empty string.
    #[error("public key is empty")]
    Empty,
    /// The encoded key was not valid base64.
    #[error("public key is not valid base64: {0}")]
    Base64(#[source] base64::DecodeError),
    /// The decoded bytes are not a point on the P-256 curve.
    #[error("public key is not a valid P-256 SEC1 point")]
    NotP256,
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::SigningKey;
    use p256::ecdsa::signature::Signer;

    fn keypair() -> (SigningKey, VerifyingKey) {
        let signing = SigningKey::random(&mut rand::thread_rng());
        let verifying = *signing.verifying_key();
        (signing, verifying)
    }

    fn sign_raw(key: &SigningKey, message: &[u8]) -> String {
        let signature: Signature = key.sign(message);
        b64::encode(signature.to_bytes())
    }

    #[test]
    fn sha256_hex_is_lowercase_and_64_chars() {
        let digest = sha256_hex(b"abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(digest.len(), 64);
    }

    #[test]
    fn sha256_hex_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn constant_time_eq_agrees_with_plain_equality() {
        assert!(constant_time_eq(b"same", b"same"));
        assert!(!constant_time_eq(b"same", b"sama"));
        assert!(!constant_time_eq(b"short", b"longer input"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn contains_constant_time_scans_every_element() {
        let haystack = vec!["aa".to_string(), "bb".to_string(), "cc".to_string()];
        assert!(contains_constant_time(&haystack, "bb"));
        assert!(contains_constant_time(&haystack, "cc"));
        assert!(!contains_constant_time(&haystack, "dd"));
        assert!(!contains_constant_time(&[], "aa"));
    }

    #[test]
    fn verifies_raw_signature() {
        let (signing, verifying) = keypair();
        let message = b"whitelisted destination";
        let signature = sign_raw(&signing, message);
        assert!(verify_p256_signature(&verifying, message, &signature));
    }

    #[test]
    fn rejects_signature_by_other_key() {
        let (signing, _) = keypair();
        let (_, other) = keypair();
        let message = b"whitelisted destination";
        let signature = sign_raw(&signing, message);
        assert!(!verify_p256_signature(&other, message, &signature));
    }

    #[test]
    fn rejects_signature_over_other_message() {
        let (signing, verifying) = keypair();
        let signature = sign_raw(&signing, b"message one");
        assert!(!verify_p256_signature(&verifying, b"message two", &signature));
    }

    #[test]
    fn rejects_der_encoded_signature() {
        let (signing, verifying) = keypair();
        let message = b"whitelisted destination";
        let signature: Signature = signing.sign(message);
        let der = b64::encode(signature.to_der());
        assert!(!verify_p256_signature(&verifying, message, &der));
    }

    #[test]
    fn rejects_wrong_length_and_malformed_base64() {
        let (_, verifying) = keypair();
        assert!(!verify_p256_signature(&verifying, b"m", &b64::encode([0u8; 63])));
        assert!(!verify_p256_signature(&verifying, b"m", &b64::encode([0u8; 65])));
        assert!(!verify_p256_signature(&verifying, b"m", "not base64 at all"));
        assert!(!verify_p256_signature(&verifying, b"m", ""));
    }

    #[test]
    fn rejects_all_zero_signature() {
        let (_, verifying) = keypair();
        assert!(!verify_p256_signature(
            &verifying,
            b"m",
            &b64::encode([0u8; 64])
        ));
    }

    #[test]
    fn public_key_round_trips_sec1() {
        let (_, verifying) = keypair();
        let compressed = b64::encode(verifying.to_encoded_point(true).as_bytes());
        let uncompressed = b64::encode(verifying.to_encoded_point(false).as_bytes());
        let from_compressed = P256PublicKey::from_base64(&compressed).unwrap();
        let from_uncompressed = P256PublicKey::from_base64(&uncompressed).unwrap();
        assert_eq!(from_compressed.verifying_key(), &verifying);
        assert_eq!(from_uncompressed.verifying_key(), &verifying);
    }

    #[test]
    fn public_key_rejects_non_curve_bytes() {
        assert!(matches!(
            P256PublicKey::from_base64(&b64::encode([0x04u8; 65])),
            Err(PublicKeyError::NotP256)
        ));
        assert!(matches!(
            P256PublicKey::from_base64(""),
            Err(PublicKeyError::Empty)
        ));
        assert!(matches!(
            P256PublicKey::from_base64("!!!"),
            Err(PublicKeyError::Base64(_))
        ));
    }
}
