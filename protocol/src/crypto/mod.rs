//! # Cryptographic Primitives for PaySign
//!
//! Everything signature-related flows through here:
//!
//! - **ECDSA P-256 / SHA-256** for payer signatures. This is what the secure
//!   enclaves on phones produce, so it is what we verify.
//! - **SHA-256** for digests in logs.
//!
//! Everything here is a thin, type-safe wrapper around the audited `p256`
//! and `sha2` implementations.

pub mod hash;
pub mod keys;
pub mod verifier;

pub use hash::{sha256, sha256_hex};
pub use keys::{DeviceKey, KeyError, SignatureProvider};
pub use verifier::{decode_public_key, decode_signature, verify, verify_der, VerifierError};
