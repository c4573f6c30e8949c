//! # Identity Module
//!
//! Who is paying, and which key speaks for them.
//!
//! 1. **SenderId**: A validated, opaque sender identifier (usually a DID).
//! 2. **KeyRegistry**: Persistent sender → public key mapping, with
//!    registration and key rotation.
//! 3. **IdentityLookup**: The read-only boundary the workflow consumes.
//!
//! ## Design Decisions
//!
//! - Identifiers are never parsed. `did:paysign:host:42` and
//!   `did:paysign:other:42` are unrelated identities even though they share a
//!   suffix; the whole string is the lookup key.
//! - Registered keys are P-256 SubjectPublicKeyInfo, validated at
//!   registration so that a bad key cannot sit in the registry waiting to
//!   fail every future signature.

pub mod registry;
pub mod sender;

pub use registry::{IdentityLookup, KeyRegistry, LookupError, RegisteredKey, RegistryError};
pub use sender::{SenderId, SenderIdError};
