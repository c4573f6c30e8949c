//! # Transaction Module
//!
//! Offers, their canonical signed form, and their lifecycle.
//!
//! ## Architecture
//!
//! ```text
//! types.rs       : Value types (TransactionType, TransactionStatus, Amount, Currency)
//! payload.rs     : PayloadBuilder and the immutable TransactionPayload
//! canonical.rs   : Canonical byte serialization (format version 1)
//! state.rs       : Tagged-union state machine and the Transaction record
//! signing.rs     : Wallet-side signing of canonical bytes
//! verification.rs: Canonicalize + verify, classified by outcome
//! view.rs        : camelCase wire representation
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Offer**: The payee builds a payload with [`PayloadBuilder`]; the
//!    service wraps it in a Pending [`Transaction`].
//! 2. **Sign**: The payer's device signs [`canonical_bytes`] of the payload.
//! 3. **Verify**: [`check_payload_signature`] against the sender's
//!    registered key.
//! 4. **Settle state**: [`Transaction::complete`] or [`Transaction::fail`].
//!
//! ## Design Decisions
//!
//! - Amounts are `rust_decimal::Decimal` with a fixed scale of eight. No
//!   floating point anywhere near monetary values.
//! - The canonical form is hand-specified JSON with a fixed key order rather
//!   than "whatever serde produces for the struct", so that adding a field to
//!   the payload can never silently change what is signed.
//! - Metadata travels with the payload but is outside the signature.

pub mod canonical;
pub mod payload;
pub mod signing;
pub mod state;
pub mod types;
pub mod verification;
pub mod view;

pub use canonical::{canonical_bytes, canonical_digest, CanonicalError};
pub use payload::{PayloadBuilder, TransactionPayload};
pub use signing::sign_payload;
pub use state::{StateError, Transaction, TransactionSignature, TransactionState};
pub use types::{Amount, Currency, PayloadError, TransactionStatus, TransactionType};
pub use verification::{check_payload_signature, SignatureCheck};
pub use view::{PayloadView, TransactionView};
