//! # Transaction Workflow Service
//!
//! Orchestrates the offer lifecycle against two injected boundaries: a
//! [`TransactionStore`] and an [`IdentityLookup`].
//!
//! ## Sign and complete
//!
//! ```text
//! load ──▶ Pending? ──▶ bind sender ──▶ resolve key ──▶ canonicalize + verify
//!   │          │                             │                  │
//! NotFound  InvalidState              missing: InvalidState   valid ──▶ complete ──▶ CAS
//!                                           └──── any failure ──▶ fail ──▶ CAS
//! ```
//!
//! ## Design Decisions
//!
//! - Each call is one unit of work: load, mutate in memory, persist with a
//!   compare-and-swap against the snapshot that was loaded. No locks.
//! - Once a signing attempt has started, every failure path drives the
//!   record to Failed before returning, so nothing lingers Pending after a
//!   rejected or broken attempt. A rejected signature is final.
//! - Compensation only ever moves Pending → Failed. If the swap conflicts,
//!   another caller already settled the record and it is left alone.
//! - Canonical payloads are logged only as their SHA-256 digest. Keys and
//!   signatures are never logged.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::error::{WorkflowError, INVALID_SIGNATURE, MALFORMED_SIGNATURE, UNKNOWN_SENDER_KEY};
use crate::identity::{IdentityLookup, SenderId};
use crate::storage::{StoreError, TransactionStore};
use crate::transaction::{
    canonical_digest, check_payload_signature, PayloadBuilder, SignatureCheck, Transaction,
    TransactionSignature, TransactionType,
};

/// The transaction lifecycle, end to end.
#[derive(Clone)]
pub struct TransactionService {
    store: Arc<dyn TransactionStore>,
    identities: Arc<dyn IdentityLookup>,
}

impl TransactionService {
    pub fn new(store: Arc<dyn TransactionStore>, identities: Arc<dyn IdentityLookup>) -> Self {
        Self { store, identities }
    }

    // -- Offers ---------------------------------------------------------------

    /// Validate the input, build payload and transaction, persist both in a
    /// single insert and return the Pending transaction.
    pub async fn create_offer(
        &self,
        recipient: &str,
        tx_type: TransactionType,
        amount: Decimal,
        currency: &str,
        metadata: Option<String>,
    ) -> Result<Transaction, WorkflowError> {
        let payload = PayloadBuilder::new(tx_type)
            .recipient(recipient)
            .amount(amount)
            .currency(currency)
            .metadata(metadata)
            .build()
            .map_err(|e| {
                debug!(error = %e, "offer rejected");
                WorkflowError::from(e)
            })?;

        let tx = Transaction::new(payload);
        self.store.insert(&tx).await.map_err(|e| {
            error!(transaction_id = %tx.id(), error = %e, "failed to persist offer");
            WorkflowError::from(e)
        })?;

        info!(
            transaction_id = %tx.id(),
            tx_type = %tx.payload().tx_type(),
            amount = %tx.payload().amount(),
            currency = %tx.payload().currency(),
            "offer created"
        );
        Ok(tx)
    }

    /// The transaction with its payload, or `NotFound`.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Transaction, WorkflowError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("transaction {id} not found")))
    }

    /// Every transaction bound to `sender`, newest first.
    pub async fn list_by_sender(&self, sender: &str) -> Result<Vec<Transaction>, WorkflowError> {
        let sender = SenderId::new(sender)?;
        Ok(self.store.list_by_sender(&sender).await?)
    }

    // -- Transitions ----------------------------------------------------------

    /// Verify the payer's signature and complete the transaction.
    ///
    /// On any failure after the attempt has started the transaction is moved
    /// to Failed before the error is returned.
    pub async fn sign_and_complete(
        &self,
        id: Uuid,
        sender: &str,
        signature: &str,
    ) -> Result<Transaction, WorkflowError> {
        let loaded = self.get_by_id(id).await?;
        if loaded.is_terminal() {
            warn!(
                transaction_id = %id,
                status = %loaded.status(),
                "sign attempt on settled transaction"
            );
            return Err(WorkflowError::InvalidState(format!(
                "transaction {id} is {}, expected Pending",
                loaded.status()
            )));
        }

        // Input checks come before any mutation.
        let sender = SenderId::new(sender)?;
        let signature = TransactionSignature::new(signature)
            .map_err(|e| WorkflowError::Validation(e.to_string()))?;

        let bound = loaded.clone().bind_sender(sender.clone())?;

        let completed = match self.verify_and_complete(&bound, &sender, signature).await {
            Ok(completed) => completed,
            Err(err) => {
                self.compensate(&loaded, bound).await;
                return Err(err);
            }
        };

        match self.store.compare_and_swap(&loaded, &completed).await {
            Ok(()) => {
                info!(transaction_id = %id, sender = %sender, "transaction completed");
                Ok(completed)
            }
            Err(StoreError::Conflict(_)) => Err(self.settled_elsewhere(id).await),
            Err(e) => {
                error!(transaction_id = %id, error = %e, "failed to persist completion");
                self.compensate(&loaded, bound).await;
                Err(e.into())
            }
        }
    }

    /// Pending → Failed.
    pub async fn fail(&self, id: Uuid) -> Result<Transaction, WorkflowError> {
        let loaded = self.get_by_id(id).await?;
        let failed = loaded.clone().fail()?;

        match self.store.compare_and_swap(&loaded, &failed).await {
            Ok(()) => {
                info!(transaction_id = %id, "transaction failed");
                Ok(failed)
            }
            Err(StoreError::Conflict(_)) => Err(self.settled_elsewhere(id).await),
            Err(e) => {
                error!(transaction_id = %id, error = %e, "failed to persist failure");
                Err(e.into())
            }
        }
    }

    // -- Internals ------------------------------------------------------------

    /// Steps 4 to 7: resolve the key, verify, and build the Completed record.
    async fn verify_and_complete(
        &self,
        bound: &Transaction,
        sender: &SenderId,
        signature: TransactionSignature,
    ) -> Result<Transaction, WorkflowError> {
        let id = bound.id();

        let public_key = match self.identities.resolve_public_key(sender).await {
            Ok(Some(key)) => key,
            Ok(None) => {
                warn!(transaction_id = %id, sender = %sender, "sender has no registered key");
                return Err(WorkflowError::InvalidState(UNKNOWN_SENDER_KEY.to_string()));
            }
            Err(e) => {
                error!(transaction_id = %id, error = %e, "identity lookup failed");
                return Err(e.into());
            }
        };

        let check = check_payload_signature(bound.payload(), &public_key, signature.as_str())
            .map_err(|e| {
                error!(transaction_id = %id, error = %e, "payload could not be canonicalized");
                WorkflowError::from(e)
            })?;

        match check {
            SignatureCheck::Valid => {
                debug!(transaction_id = %id, "signature verified");
                Ok(bound.clone().complete(signature)?)
            }
            SignatureCheck::Mismatch => {
                warn!(
                    transaction_id = %id,
                    sender = %sender,
                    digest = %canonical_digest(bound.payload()).unwrap_or_default(),
                    "signature does not match payload"
                );
                Err(WorkflowError::InvalidState(INVALID_SIGNATURE.to_string()))
            }
            SignatureCheck::MalformedSignature => {
                warn!(transaction_id = %id, sender = %sender, "malformed signature encoding");
                Err(WorkflowError::InvalidState(MALFORMED_SIGNATURE.to_string()))
            }
            SignatureCheck::UnusablePublicKey => {
                warn!(transaction_id = %id, sender = %sender, "registered key is unusable");
                Err(WorkflowError::InvalidState(INVALID_SIGNATURE.to_string()))
            }
        }
    }

    /// Drive a started attempt to Failed. Best effort: errors are logged and
    /// the original error is what the caller sees.
    async fn compensate(&self, loaded: &Transaction, bound: Transaction) {
        let id = loaded.id();
        let failed = match bound.fail() {
            Ok(failed) => failed,
            Err(e) => {
                error!(transaction_id = %id, error = %e, "cannot fail transaction");
                return;
            }
        };

        match self.store.compare_and_swap(loaded, &failed).await {
            Ok(()) => info!(transaction_id = %id, "transaction failed after rejected attempt"),
            Err(StoreError::Conflict(_)) => {
                debug!(transaction_id = %id, "already settled, compensation skipped")
            }
            Err(e) => error!(transaction_id = %id, error = %e, "compensation failed"),
        }
    }

    /// Explains a lost compare-and-swap by re-reading the record.
    async fn settled_elsewhere(&self, id: Uuid) -> WorkflowError {
        match self.store.get(id).await {
            Ok(Some(current)) => {
                warn!(
                    transaction_id = %id,
                    status = %current.status(),
                    "concurrent update won"
                );
                WorkflowError::InvalidState(format!(
                    "transaction {id} is {}, expected Pending",
                    current.status()
                ))
            }
            Ok(None) => WorkflowError::NotFound(format!("transaction {id} not found")),
            Err(e) => e.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
