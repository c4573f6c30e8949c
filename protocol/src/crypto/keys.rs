//! # Device Keys
//!
//! The signing side of the protocol. In production the private key lives in
//! the payer's secure enclave and never reaches this process; the server only
//! ever sees a public key at registration time and a finished signature at
//! completion time.
//!
//! [`SignatureProvider`] is the seam the wallet implements. [`DeviceKey`] is a
//! software implementation of it, used by `paysign-node keygen`, the
//! integration tests and the benchmarks.
//!
//! ## Security considerations
//!
//! - Keys are generated with `OsRng`.
//! - Private key bytes are never logged and `DeviceKey` has no `Debug` output
//!   beyond its public half.
//! - Export is an explicit call (`to_pkcs8_b64`), never a side effect of
//!   serialization.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey};
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during key operations. Deliberately vague.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid private key: not a base64 PKCS#8 P-256 key")]
    InvalidPrivateKey,

    #[error("public key encoding failed")]
    Encoding,
}

/// Anything that can sign canonical payload bytes on behalf of a payer.
///
/// The output formats match what [`super::verifier::verify`] accepts.
pub trait SignatureProvider: Send + Sync {
    /// Standard Base64 of the DER SubjectPublicKeyInfo, as registered with
    /// the identity registry.
    fn public_key_spki_b64(&self) -> String;

    /// Sign `message` with ECDSA P-256/SHA-256 and return the DER signature
    /// as URL-safe Base64 without padding.
    fn sign(&self, message: &[u8]) -> String;
}

/// A P-256 key pair held in process memory.
///
/// # Examples
///
/// ```
/// use paysign_protocol::crypto::{DeviceKey, SignatureProvider};
///
/// let key = DeviceKey::generate().unwrap();
/// let signature = key.sign(b"canonical bytes");
/// assert!(!signature.contains('='));
/// ```
pub struct DeviceKey {
    signing_key: SigningKey,
    // Cached so that `public_key_spki_b64` is infallible.
    spki_b64: String,
}

impl DeviceKey {
    /// Generate a fresh key pair from the OS RNG.
    pub fn generate() -> Result<Self, KeyError> {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Restore a key pair from standard Base64 of a PKCS#8 DER document.
    pub fn from_pkcs8_b64(encoded: &str) -> Result<Self, KeyError> {
        let der = STANDARD
            .decode(encoded.trim())
            .map_err(|_| KeyError::InvalidPrivateKey)?;
        let signing_key =
            SigningKey::from_pkcs8_der(&der).map_err(|_| KeyError::InvalidPrivateKey)?;
        Self::from_signing_key(signing_key)
    }

    fn from_signing_key(signing_key: SigningKey) -> Result<Self, KeyError> {
        let spki = signing_key
            .verifying_key()
            .to_public_key_der()
            .map_err(|_| KeyError::Encoding)?;
        let spki_b64 = STANDARD.encode(spki.as_bytes());
        Ok(Self {
            signing_key,
            spki_b64,
        })
    }

    /// Export the private key as standard Base64 of a PKCS#8 DER document.
    ///
    /// Handle the result like the secret it is.
    pub fn to_pkcs8_b64(&self) -> Result<String, KeyError> {
        let doc = self
            .signing_key
            .to_pkcs8_der()
            .map_err(|_| KeyError::Encoding)?;
        Ok(STANDARD.encode(doc.as_bytes()))
    }

    /// The public half.
    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl SignatureProvider for DeviceKey {
    fn public_key_spki_b64(&self) -> String {
        self.spki_b64.clone()
    }

    fn sign(&self, message: &[u8]) -> String {
        let signature: Signature = self.signing_key.sign(message);
        URL_SAFE_NO_PAD.encode(signature.to_der().as_bytes())
    }
}

impl fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceKey")
            .field("public_key", &self.spki_b64)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::verifier::{decode_public_key, verify};

    #[test]
    fn test_generated_keys_are_distinct() {
        let a = DeviceKey::generate().unwrap();
        let b = DeviceKey::generate().unwrap();
        assert_ne!(a.public_key_spki_b64(), b.public_key_spki_b64());
    }

    #[test]
    fn test_public_key_decodes_as_spki() {
        let key = DeviceKey::generate().unwrap();
        let decoded = decode_public_key(&key.public_key_spki_b64()).unwrap();
        assert_eq!(&decoded, key.verifying_key());
    }

    #[test]
    fn test_signature_is_unpadded_url_safe() {
        let key = DeviceKey::generate().unwrap();
        for i in 0..16u8 {
            let sig = key.sign(&[i; 32]);
            assert!(!sig.contains('='));
            assert!(!sig.contains('+'));
            assert!(!sig.contains('/'));
        }
    }

    #[test]
    fn test_pkcs8_roundtrip_preserves_identity() {
        let key = DeviceKey::generate().unwrap();
        let exported = key.to_pkcs8_b64().unwrap();
        let restored = DeviceKey::from_pkcs8_b64(&exported).unwrap();
        assert_eq!(key.public_key_spki_b64(), restored.public_key_spki_b64());

        let sig = restored.sign(b"restored");
        assert!(verify(&key.public_key_spki_b64(), b"restored", &sig));
    }

    #[test]
    fn test_invalid_pkcs8_rejected() {
        match DeviceKey::from_pkcs8_b64("AAAA") {
            Err(KeyError::InvalidPrivateKey) => {}
            other => panic!("expected InvalidPrivateKey, got {:?}", other),
        }
    }

    #[test]
    fn test_debug_does_not_leak_private_key() {
        let key = DeviceKey::generate().unwrap();
        let pkcs8 = key.to_pkcs8_b64().unwrap();
        let debug = format!("{:?}", key);
        assert!(!debug.contains(&pkcs8));
        assert!(debug.contains(&key.public_key_spki_b64()));
    }
}
