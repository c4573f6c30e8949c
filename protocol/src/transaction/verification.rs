//! Payload signature verification.
//!
//! Glues the canonicalizer to the verifier and classifies the outcome so the
//! workflow can log a garbled submission differently from an honest mismatch.
//! None of the outcomes is an error: a signature that does not verify is a
//! perfectly ordinary answer. The only error is a payload that cannot be
//! canonicalized, which means the stored record is corrupt.

use p256::ecdsa::signature::Verifier;

use super::canonical::{canonical_bytes, CanonicalError};
use super::payload::TransactionPayload;
use crate::crypto::verifier::{decode_public_key, decode_signature};

/// Outcome of checking a submitted signature against a registered key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// The signature is valid for the canonical payload under the key.
    Valid,
    /// Everything decoded, but the signature does not match.
    Mismatch,
    /// The submitted signature is not URL-safe Base64 of a DER signature.
    MalformedSignature,
    /// The registered key does not decode as a P-256 SPKI.
    UnusablePublicKey,
}

/// Check `signature_b64url` over the canonical bytes of `payload`.
///
/// Equivalent to `verify(public_key_b64, &canonical_bytes(payload)?, sig)`
/// with the `false` case split by cause.
pub fn check_payload_signature(
    payload: &TransactionPayload,
    public_key_b64: &str,
    signature_b64url: &str,
) -> Result<SignatureCheck, CanonicalError> {
    let message = canonical_bytes(payload)?;

    let Ok(key) = decode_public_key(public_key_b64) else {
        return Ok(SignatureCheck::UnusablePublicKey);
    };
    let Ok(signature) = decode_signature(signature_b64url) else {
        return Ok(SignatureCheck::MalformedSignature);
    };

    if key.verify(&message, &signature).is_ok() {
        Ok(SignatureCheck::Valid)
    } else {
        Ok(SignatureCheck::Mismatch)
    }
}
