//! # Signature Verification
//!
//! ECDSA over NIST P-256 with SHA-256: the proof that a canonical payload was
//! signed by whoever holds the private key behind a registered public key.
//!
//! ## Wire formats
//!
//! - **Public key**: DER-encoded SubjectPublicKeyInfo, transported as
//!   standard Base64. Keys on any other curve are rejected at decode time.
//! - **Signature**: ASN.1/DER `ECDSA-Sig-Value` (`SEQUENCE { r, s }`),
//!   transported as URL-safe Base64. Wallets strip the padding, so we put it
//!   back before decoding.
//!
//! ## Design Decisions
//!
//! - [`verify`] answers with a `bool`. Bad Base64, a malformed key, a
//!   malformed signature and a signature that simply does not match all come
//!   out as `false`. Nothing here panics and nothing is propagated past this
//!   boundary.
//! - The decode helpers are public and return [`VerifierError`] so that the
//!   workflow can tell a garbled submission apart from an honest mismatch in
//!   its logs. The error variants stay vague on purpose; they carry no bytes.
//! - No state. Every function is safe to call from any number of threads.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;
use thiserror::Error;

use crate::config::MAX_DER_SIGNATURE_LENGTH;

/// Why a key or signature could not be decoded.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VerifierError {
    #[error("public key is not a base64 DER P-256 SubjectPublicKeyInfo")]
    InvalidPublicKey,

    #[error("signature is not a base64url DER ECDSA signature")]
    MalformedSignature,
}

/// Verify a signature over `message`.
///
/// `public_key_b64` is standard Base64 of a DER SubjectPublicKeyInfo;
/// `signature_b64url` is URL-safe Base64 (padding optional) of a DER
/// signature. Returns `true` only if everything decodes and the signature
/// matches.
///
/// # Example
///
/// ```
/// use paysign_protocol::crypto::{verify, DeviceKey, SignatureProvider};
///
/// let key = DeviceKey::generate().unwrap();
/// let message = b"{\"Id\":\"...\"}";
/// let signature = key.sign(message);
///
/// assert!(verify(&key.public_key_spki_b64(), message, &signature));
/// assert!(!verify(&key.public_key_spki_b64(), b"something else", &signature));
/// ```
pub fn verify(public_key_b64: &str, message: &[u8], signature_b64url: &str) -> bool {
    let Ok(key) = decode_public_key(public_key_b64) else {
        return false;
    };
    let Ok(der) = decode_base64url(signature_b64url) else {
        return false;
    };
    verify_der(&key, message, &der)
}

/// Verify a DER signature with an already decoded key.
///
/// A signature that does not parse as DER is simply a failed verification.
pub fn verify_der(key: &VerifyingKey, message: &[u8], der_signature: &[u8]) -> bool {
    if der_signature.len() > MAX_DER_SIGNATURE_LENGTH {
        return false;
    }
    match Signature::from_der(der_signature) {
        Ok(signature) => key.verify(message, &signature).is_ok(),
        Err(_) => false,
    }
}

/// Decode a standard-Base64 DER SubjectPublicKeyInfo into a P-256 key.
///
/// Fails for bad Base64, a structure that is not SPKI, or an SPKI whose
/// algorithm or curve is not P-256.
pub fn decode_public_key(public_key_b64: &str) -> Result<VerifyingKey, VerifierError> {
    let der = STANDARD
        .decode(public_key_b64.trim())
        .map_err(|_| VerifierError::InvalidPublicKey)?;
    VerifyingKey::from_public_key_der(&der).map_err(|_| VerifierError::InvalidPublicKey)
}

/// Decode a URL-safe Base64 DER signature and check that it parses.
pub fn decode_signature(signature_b64url: &str) -> Result<Signature, VerifierError> {
    let der = decode_base64url(signature_b64url)?;
    if der.len() > MAX_DER_SIGNATURE_LENGTH {
        return Err(VerifierError::MalformedSignature);
    }
    Signature::from_der(&der).map_err(|_| VerifierError::MalformedSignature)
}

/// Decode URL-safe Base64 with optional padding.
///
/// `-` becomes `+`, `_` becomes `/`, and the input is re-padded to a multiple
/// of four before a standard decode. A length of `1 mod 4` can never come out
/// of an encoder and is rejected.
pub fn decode_base64url(input: &str) -> Result<Vec<u8>, VerifierError> {
    let mut standard: String = input
        .trim()
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    match standard.len() % 4 {
        0 => {}
        2 => standard.push_str("=="),
        3 => standard.push('='),
        _ => return Err(VerifierError::MalformedSignature),
    }

    STANDARD
        .decode(standard.as_bytes())
        .map_err(|_| VerifierError::MalformedSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{DeviceKey, SignatureProvider};
    use base64::engine::general_purpose::URL_SAFE;

    #[test]
    fn test_sign_and_verify() {
        let key = DeviceKey::generate().unwrap();
        let msg = b"pay 12.50 EUR";
        let sig = key.sign(msg);
        assert!(verify(&key.public_key_spki_b64(), msg, &sig));
    }

    #[test]
    fn test_wrong_message_fails() {
        let key = DeviceKey::generate().unwrap();
        let sig = key.sign(b"correct message");
        assert!(!verify(&key.public_key_spki_b64(), b"wrong message", &sig));
    }

    #[test]
    fn test_wrong_key_fails() {
        let signer = DeviceKey::generate().unwrap();
        let other = DeviceKey::generate().unwrap();
        let sig = signer.sign(b"test message");
        assert!(!verify(&other.public_key_spki_b64(), b"test message", &sig));
    }

    #[test]
    fn test_padded_signature_is_accepted() {
        let key = DeviceKey::generate().unwrap();
        let msg = b"padding is optional";
        let der = decode_base64url(&key.sign(msg)).unwrap();
        let padded = URL_SAFE.encode(&der);
        assert!(verify(&key.public_key_spki_b64(), msg, &padded));
    }

    #[test]
    fn test_garbage_inputs_return_false() {
        let key = DeviceKey::generate().unwrap();
        let sig = key.sign(b"m");
        assert!(!verify("not base64 !!", b"m", &sig));
        assert!(!verify("AAAA", b"m", &sig));
        assert!(!verify(&key.public_key_spki_b64(), b"m", "###"));
        assert!(!verify(&key.public_key_spki_b64(), b"m", ""));
        assert!(!verify(&key.public_key_spki_b64(), b"m", "AAAA"));
    }

    #[test]
    fn test_non_spki_key_is_rejected() {
        // A raw SEC1 point is valid P-256 material but not SPKI.
        let key = DeviceKey::generate().unwrap();
        let sec1 = key.verifying_key().to_encoded_point(false);
        let b64 = STANDARD.encode(sec1.as_bytes());
        assert!(matches!(
            decode_public_key(&b64),
            Err(VerifierError::InvalidPublicKey)
        ));
    }

    #[test]
    fn test_length_one_mod_four_is_illegal() {
        assert_eq!(
            decode_base64url("AAAAA"),
            Err(VerifierError::MalformedSignature)
        );
    }

    #[test]
    fn test_base64url_substitution() {
        // 0xfb 0xff encodes to "-_8" in URL-safe form and "+/8=" in standard.
        assert_eq!(decode_base64url("-_8").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(decode_base64url("-_8=").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_oversized_signature_is_malformed() {
        let der = vec![0x30u8; MAX_DER_SIGNATURE_LENGTH + 1];
        let encoded = URL_SAFE.encode(der);
        assert!(matches!(
            decode_signature(&encoded),
            Err(VerifierError::MalformedSignature)
        ));
    }

    #[test]
    fn test_raw_fixed_size_signature_is_malformed() {
        // 64-byte r||s is a common client mistake; only DER is accepted.
        let key = DeviceKey::generate().unwrap();
        let der = decode_base64url(&key.sign(b"m")).unwrap();
        let fixed = Signature::from_der(&der).unwrap().to_bytes();
        let encoded = URL_SAFE.encode(fixed);
        assert!(!verify(&key.public_key_spki_b64(), b"m", &encoded));
    }
}
