// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # PaySign Protocol: Core Library
//!
//! A payee proposes a payment, the payer signs a canonical form of that
//! proposal with a key that never leaves their phone, and this library
//! decides whether the signature is good enough to mark the payment done.
//! At most once, and never without a valid signature.
//!
//! ## Architecture
//!
//! - **transaction**: Payloads, the canonical signed form, the state machine.
//! - **crypto**: ECDSA P-256 verification and a software signing key.
//! - **identity**: Sender identifiers and the sender → public key registry.
//! - **storage**: Persistence boundary and its sled implementation.
//! - **workflow**: The service that ties it together.
//! - **config**: Protocol constants.
//!
//! ## Design Philosophy
//!
//! 1. Invalid states are unrepresentable where the type system allows it.
//! 2. "Signature did not match" is an answer, not an exception.
//! 3. If it touches money, it has tests. Plural.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use paysign_protocol::crypto::{DeviceKey, SignatureProvider};
//! use paysign_protocol::identity::{KeyRegistry, SenderId};
//! use paysign_protocol::storage::PaySignDb;
//! use paysign_protocol::transaction::{sign_payload, TransactionType};
//! use paysign_protocol::workflow::TransactionService;
//! use rust_decimal::Decimal;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let db = PaySignDb::open_temporary()?;
//! let registry = KeyRegistry::open(&db)?;
//! let wallet = DeviceKey::generate()?;
//! let payer = SenderId::new("did:paysign:wallet.example:alice")?;
//! registry.register(&payer, &wallet.public_key_spki_b64())?;
//!
//! let service = TransactionService::new(Arc::new(db), Arc::new(registry));
//! let offer = service
//!     .create_offer("did:example:merchant", TransactionType::Payment, Decimal::new(1250, 2), "EUR", None)
//!     .await?;
//!
//! let signature = sign_payload(offer.payload(), &wallet)?;
//! let done = service.sign_and_complete(offer.id(), payer.as_str(), &signature).await?;
//! assert!(done.signature().is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod identity;
pub mod storage;
pub mod transaction;
pub mod workflow;
