//! The persistence boundary the workflow service talks to.
//!
//! Implementations must make each call atomic. `compare_and_swap` is what
//! serializes concurrent completions of the same transaction: of two callers
//! holding the same Pending snapshot, exactly one swap succeeds and the other
//! gets [`StoreError::Conflict`].

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::db::DbError;
use crate::identity::SenderId;
use crate::transaction::Transaction;

/// Errors surfaced by a [`TransactionStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// `insert` was called with an ID that already exists.
    #[error("transaction {0} already exists")]
    Duplicate(Uuid),

    /// `compare_and_swap` targeted a record that does not exist.
    #[error("transaction {0} not found")]
    NotFound(Uuid),

    /// The stored record no longer matches the caller's snapshot.
    #[error("transaction {0} was modified concurrently")]
    Conflict(Uuid),

    /// The underlying database failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// The blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(String),
}

/// Durable storage for transactions and their payloads.
///
/// A transaction and its payload are one record; there is no way to write
/// one without the other.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persist a new record. Fails with [`StoreError::Duplicate`] if the ID
    /// is taken; nothing is written in that case.
    async fn insert(&self, tx: &Transaction) -> Result<(), StoreError>;

    /// Load a record by transaction ID.
    async fn get(&self, id: Uuid) -> Result<Option<Transaction>, StoreError>;

    /// Replace `expected` with `updated`, but only if the stored record is
    /// still exactly `expected`.
    async fn compare_and_swap(
        &self,
        expected: &Transaction,
        updated: &Transaction,
    ) -> Result<(), StoreError>;

    /// All records bound to `sender`, newest first.
    async fn list_by_sender(&self, sender: &SenderId) -> Result<Vec<Transaction>, StoreError>;
}
