//! # Transaction State Machine
//!
//! A [`Transaction`] pairs an immutable [`TransactionPayload`] with a
//! [`TransactionState`]. The state is a tagged union whose variants carry only
//! the fields that are legal in that state:
//!
//! ```text
//!                 complete(sig)
//!   Pending ───────────────────────▶ Completed { sender, signature }
//!   { sender? }
//!      │          fail()
//!      └───────────────────────────▶ Failed { sender? }
//! ```
//!
//! ## Design Decisions
//!
//! - Only `Completed` has a signature field, and its sender is not optional.
//!   "Signature present iff Completed" and "no completion without a sender"
//!   hold by construction; there is nothing to check at runtime.
//! - Transitions take `self` and hand back a new `Transaction` or a
//!   [`StateError`]. There are no setters; the payload is fixed at
//!   construction and no method replaces it.
//! - Every illegal request is an error. Nothing is a silent no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use super::payload::TransactionPayload;
use super::types::TransactionStatus;
use crate::identity::SenderId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A requested transition or mutation is not legal in the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Completed and Failed are final.
    #[error("transaction is already {0} and cannot change")]
    Terminal(TransactionStatus),

    /// Pending → Pending was requested.
    #[error("transaction is already Pending")]
    NoOpTransition,

    /// A different sender is already bound to this transaction.
    #[error("transaction is bound to a different sender")]
    SenderMismatch,

    /// Completion was requested before a sender was bound.
    #[error("sender must be bound before completion")]
    SenderNotBound,

    /// Completion was requested without a signature.
    #[error("a non-empty signature is required to complete")]
    MissingSignature,
}

// ---------------------------------------------------------------------------
// TransactionSignature
// ---------------------------------------------------------------------------

/// The payer's signature as submitted: URL-safe Base64 of a DER ECDSA
/// signature. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionSignature(String);

impl TransactionSignature {
    pub fn new(encoded: &str) -> Result<Self, StateError> {
        let trimmed = encoded.trim();
        if trimmed.is_empty() {
            return Err(StateError::MissingSignature);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TransactionSignature {
    type Error = StateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<TransactionSignature> for String {
    fn from(value: TransactionSignature) -> Self {
        value.0
    }
}

// ---------------------------------------------------------------------------
// TransactionState
// ---------------------------------------------------------------------------

/// Lifecycle state with the fields legal in each state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionState {
    /// Waiting for the payer. The sender is bound during the signing attempt.
    Pending { sender: Option<SenderId> },
    /// Signature verified against the sender's registered key.
    Completed {
        sender: SenderId,
        signature: TransactionSignature,
    },
    /// Rejected or abandoned. Keeps the sender if one was bound before the
    /// failure, so a rejected attempt stays attributable.
    Failed { sender: Option<SenderId> },
}

impl TransactionState {
    pub fn status(&self) -> TransactionStatus {
        match self {
            Self::Pending { .. } => TransactionStatus::Pending,
            Self::Completed { .. } => TransactionStatus::Completed,
            Self::Failed { .. } => TransactionStatus::Failed,
        }
    }

    pub fn sender(&self) -> Option<&SenderId> {
        match self {
            Self::Pending { sender } | Self::Failed { sender } => sender.as_ref(),
            Self::Completed { sender, .. } => Some(sender),
        }
    }

    pub fn signature(&self) -> Option<&TransactionSignature> {
        match self {
            Self::Completed { signature, .. } => Some(signature),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// An offer and where it stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: Uuid,
    payload: TransactionPayload,
    state: TransactionState,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

impl Transaction {
    /// Wraps a freshly built payload in a new Pending transaction.
    pub fn new(payload: TransactionPayload) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            payload,
            state: TransactionState::Pending { sender: None },
            created_at: now,
            modified_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn payload(&self) -> &TransactionPayload {
        &self.payload
    }

    pub fn state(&self) -> &TransactionState {
        &self.state
    }

    pub fn status(&self) -> TransactionStatus {
        self.state.status()
    }

    pub fn sender(&self) -> Option<&SenderId> {
        self.state.sender()
    }

    pub fn signature(&self) -> Option<&TransactionSignature> {
        self.state.signature()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    // -- Transitions ---------------------------------------------------------

    /// Binds the paying party. Legal only while Pending.
    ///
    /// Re-binding the same sender is accepted; binding a different one is
    /// [`StateError::SenderMismatch`].
    pub fn bind_sender(self, sender: SenderId) -> Result<Self, StateError> {
        match &self.state {
            TransactionState::Pending { sender: None } => {
                Ok(self.with_state(TransactionState::Pending {
                    sender: Some(sender),
                }))
            }
            TransactionState::Pending {
                sender: Some(bound),
            } if *bound == sender => Ok(self.with_state(TransactionState::Pending {
                sender: Some(sender),
            })),
            TransactionState::Pending { sender: Some(_) } => Err(StateError::SenderMismatch),
            other => Err(StateError::Terminal(other.status())),
        }
    }

    /// Pending → Completed. Requires a bound sender.
    pub fn complete(self, signature: TransactionSignature) -> Result<Self, StateError> {
        match &self.state {
            TransactionState::Pending {
                sender: Some(sender),
            } => {
                let sender = sender.clone();
                Ok(self.with_state(TransactionState::Completed { sender, signature }))
            }
            TransactionState::Pending { sender: None } => Err(StateError::SenderNotBound),
            other => Err(StateError::Terminal(other.status())),
        }
    }

    /// Pending → Failed. Keeps the bound sender, if any.
    pub fn fail(self) -> Result<Self, StateError> {
        match &self.state {
            TransactionState::Pending { sender } => {
                let sender = sender.clone();
                Ok(self.with_state(TransactionState::Failed { sender }))
            }
            other => Err(StateError::Terminal(other.status())),
        }
    }

    /// Generic transition request by target status.
    ///
    /// `Completed` cannot be reached this way because it needs a signature;
    /// use [`Transaction::complete`].
    pub fn transition(self, target: TransactionStatus) -> Result<Self, StateError> {
        if self.is_terminal() {
            return Err(StateError::Terminal(self.status()));
        }
        match target {
            TransactionStatus::Pending => Err(StateError::NoOpTransition),
            TransactionStatus::Failed => self.fail(),
            TransactionStatus::Completed => Err(StateError::MissingSignature),
        }
    }

    fn with_state(mut self, state: TransactionState) -> Self {
        self.state = state;
        // Never move backwards if the wall clock does.
        self.modified_at = Utc::now().max(self.modified_at);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::payload::PayloadBuilder;
    use crate::transaction::types::TransactionType;
    use rust_decimal::Decimal;

    fn pending() -> Transaction {
        let payload = PayloadBuilder::new(TransactionType::Payment)
            .recipient("did:example:merchant")
            .amount(Decimal::new(1250, 2))
            .currency("EUR")
            .build()
            .unwrap();
        Transaction::new(payload)
    }

    fn sender(s: &str) -> SenderId {
        SenderId::new(s).unwrap()
    }

    fn sig() -> TransactionSignature {
        TransactionSignature::new("MEUCIQ").unwrap()
    }

    /// Signature present iff Completed, sender present whenever Completed.
    fn assert_invariants(tx: &Transaction) {
        assert_eq!(
            tx.signature().is_some(),
            tx.status() == TransactionStatus::Completed
        );
        if tx.status() == TransactionStatus::Completed {
            assert!(tx.sender().is_some());
        }
        assert!(tx.modified_at() >= tx.created_at());
    }

    #[test]
    fn new_transaction_is_pending_and_unbound() {
        let tx = pending();
        assert_eq!(tx.status(), TransactionStatus::Pending);
        assert!(tx.sender().is_none());
        assert_eq!(tx.created_at(), tx.modified_at());
        assert_ne!(tx.id(), tx.payload().id());
        assert_invariants(&tx);
    }

    #[test]
    fn bind_then_complete() {
        let tx = pending().bind_sender(sender("did:a")).unwrap();
        assert_invariants(&tx);
        let tx = tx.complete(sig()).unwrap();
        assert_eq!(tx.status(), TransactionStatus::Completed);
        assert_eq!(tx.sender().unwrap().as_str(), "did:a");
        assert_eq!(tx.signature().unwrap().as_str(), "MEUCIQ");
        assert_invariants(&tx);
    }

    #[test]
    fn complete_without_sender_rejected() {
        assert_eq!(pending().complete(sig()), Err(StateError::SenderNotBound));
    }

    #[test]
    fn empty_signature_cannot_exist() {
        assert_eq!(
            TransactionSignature::new("  "),
            Err(StateError::MissingSignature)
        );
    }

    #[test]
    fn rebinding_same_sender_is_accepted() {
        let tx = pending()
            .bind_sender(sender("did:a"))
            .unwrap()
            .bind_sender(sender("did:a"))
            .unwrap();
        assert_eq!(tx.sender().unwrap().as_str(), "did:a");
    }

    #[test]
    fn rebinding_different_sender_rejected() {
        let tx = pending().bind_sender(sender("did:a")).unwrap();
        assert_eq!(
            tx.bind_sender(sender("did:b")),
            Err(StateError::SenderMismatch)
        );
    }

    #[test]
    fn fail_keeps_bound_sender() {
        let tx = pending().bind_sender(sender("did:a")).unwrap().fail().unwrap();
        assert_eq!(tx.status(), TransactionStatus::Failed);
        assert_eq!(tx.sender().unwrap().as_str(), "did:a");
        assert_invariants(&tx);
    }

    #[test]
    fn pending_to_pending_rejected() {
        assert_eq!(
            pending().transition(TransactionStatus::Pending),
            Err(StateError::NoOpTransition)
        );
    }

    #[test]
    fn generic_transition_to_failed() {
        let tx = pending().transition(TransactionStatus::Failed).unwrap();
        assert_eq!(tx.status(), TransactionStatus::Failed);
    }

    #[test]
    fn generic_transition_to_completed_needs_signature() {
        assert_eq!(
            pending().transition(TransactionStatus::Completed),
            Err(StateError::MissingSignature)
        );
    }

    #[test]
    fn terminal_states_are_immutable() {
        let completed = pending()
            .bind_sender(sender("did:a"))
            .unwrap()
            .complete(sig())
            .unwrap();
        let failed = pending().fail().unwrap();

        for tx in [completed, failed] {
            let status = tx.status();
            let terminal = Err(StateError::Terminal(status));
            assert_eq!(tx.clone().fail(), terminal);
            assert_eq!(tx.clone().complete(sig()), terminal);
            assert_eq!(tx.clone().bind_sender(sender("did:a")), terminal);
            for target in [
                TransactionStatus::Pending,
                TransactionStatus::Completed,
                TransactionStatus::Failed,
            ] {
                assert_eq!(tx.clone().transition(target), terminal);
            }
        }
    }

    #[test]
    fn payload_survives_every_transition() {
        let tx = pending();
        let payload = tx.payload().clone();
        let tx = tx
            .bind_sender(sender("did:a"))
            .unwrap()
            .complete(sig())
            .unwrap();
        assert_eq!(tx.payload(), &payload);
    }

    #[test]
    fn bincode_roundtrip_preserves_state() {
        let tx = pending()
            .bind_sender(sender("did:a"))
            .unwrap()
            .complete(sig())
            .unwrap();
        let bytes = bincode::serialize(&tx).unwrap();
        let back: Transaction = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, tx);
    }
}
