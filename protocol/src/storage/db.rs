//! # PaySignDb: Persistent Storage Engine
//!
//! The persistence layer for PaySign, built on sled's embedded key-value
//! store. All on-disk data flows through this module.
//!
//! ## Tree Layout
//!
//! | Tree           | Key                                         | Value                  |
//! |----------------|---------------------------------------------|------------------------|
//! | `transactions` | `tx_id` (16B UUID)                          | `bincode(Transaction)` |
//! | `sender_index` | `len(sender)` (2B BE) ‖ sender ‖ `created` (8B) ‖ `tx_id` | `tx_id` |
//! | `identities`   | sender identifier (UTF-8)                   | `bincode(RegisteredKey)` |
//!
//! The creation time in the sender index is an order-preserving encoding of
//! the microsecond timestamp, so a reverse prefix scan yields a sender's
//! transactions newest first. The length prefix keeps one sender's prefix
//! from matching another sender whose identifier merely starts with it.
//!
//! ## Atomicity
//!
//! Inserts and compare-and-swap updates run as sled multi-tree transactions
//! over `transactions` and `sender_index`: the record and its index entry land
//! together or not at all. Every successful write is flushed before the call
//! returns.

use async_trait::async_trait;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

use super::store::{StoreError, TransactionStore};
use crate::identity::SenderId;
use crate::transaction::Transaction;

/// Name of the tree holding transaction records.
pub const TRANSACTIONS_TREE: &str = "transactions";
/// Name of the tree indexing transactions by sender.
pub const SENDER_INDEX_TREE: &str = "sender_index";
/// Name of the tree holding registered sender keys.
pub const IDENTITIES_TREE: &str = "identities";

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type DbResult<T> = Result<T, DbError>;

pub(crate) fn encode<T: serde::Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Serialization(e.to_string()))
}

/// Why a multi-tree transaction was aborted.
enum Abort {
    Duplicate,
    NotFound,
    Conflict,
    Corrupt(String),
}

// ---------------------------------------------------------------------------
// PaySignDb
// ---------------------------------------------------------------------------

/// Persistent storage engine for PaySign.
///
/// Wraps a sled `Db` and exposes typed accessors for transaction records.
/// Cloning is cheap (sled handles are reference counted), which is what lets
/// the async [`TransactionStore`] impl move a handle into `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct PaySignDb {
    db: Db,
    transactions: Tree,
    sender_index: Tree,
}

impl PaySignDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped.
    ///
    /// Ideal for tests: no filesystem side effects, no cleanup needed.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let transactions = db.open_tree(TRANSACTIONS_TREE)?;
        let sender_index = db.open_tree(SENDER_INDEX_TREE)?;

        Ok(Self {
            db,
            transactions,
            sender_index,
        })
    }

    /// Open a named tree in the same database. The identity registry lives
    /// next to the transactions this way.
    pub fn open_tree(&self, name: &str) -> DbResult<Tree> {
        Ok(self.db.open_tree(name)?)
    }

    // -- Transaction operations ---------------------------------------------

    /// Persist a new record and, if a sender is already bound, its index
    /// entry. Blocking.
    pub fn insert_transaction(&self, tx: &Transaction) -> Result<(), StoreError> {
        let id = tx.id();
        let key = *id.as_bytes();
        let value = encode(tx)?;
        let index_key = tx.sender().map(|s| sender_index_key(s, tx));

        let result = (&self.transactions, &self.sender_index).transaction(|(txs, index)| {
            if txs.get(key)?.is_some() {
                return Err(ConflictableTransactionError::Abort(Abort::Duplicate));
            }
            txs.insert(&key[..], value.as_slice())?;
            if let Some(ref index_key) = index_key {
                index.insert(index_key.as_slice(), &key[..])?;
            }
            Ok(())
        });

        self.finish(id, result)?;
        debug!(transaction_id = %id, "transaction inserted");
        Ok(())
    }

    /// Load a record. Blocking.
    pub fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError> {
        match self.transactions.get(id.as_bytes()).map_err(DbError::from)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Swap `expected` for `updated` if the stored record still equals
    /// `expected`. Adds the sender index entry the first time a sender is
    /// persisted. Blocking.
    pub fn swap_transaction(
        &self,
        expected: &Transaction,
        updated: &Transaction,
    ) -> Result<(), StoreError> {
        let id = expected.id();
        let key = *id.as_bytes();
        let value = encode(updated)?;
        let index_key = match (expected.sender(), updated.sender()) {
            (None, Some(sender)) => Some(sender_index_key(sender, updated)),
            _ => None,
        };

        let result = (&self.transactions, &self.sender_index).transaction(|(txs, index)| {
            let Some(current) = txs.get(key)? else {
                return Err(ConflictableTransactionError::Abort(Abort::NotFound));
            };
            let current: Transaction = decode(&current)
                .map_err(|e| ConflictableTransactionError::Abort(Abort::Corrupt(e.to_string())))?;
            if current != *expected {
                return Err(ConflictableTransactionError::Abort(Abort::Conflict));
            }
            txs.insert(&key[..], value.as_slice())?;
            if let Some(ref index_key) = index_key {
                index.insert(index_key.as_slice(), &key[..])?;
            }
            Ok(())
        });

        self.finish(id, result)?;
        debug!(
            transaction_id = %id,
            from = %expected.status(),
            to = %updated.status(),
            "transaction swapped"
        );
        Ok(())
    }

    /// All records bound to `sender`, newest first. Blocking.
    pub fn transactions_by_sender(&self, sender: &SenderId) -> Result<Vec<Transaction>, StoreError> {
        let prefix = sender_prefix(sender);
        let mut out = Vec::new();
        for entry in self.sender_index.scan_prefix(&prefix).rev() {
            let (_key, tx_id) = entry.map_err(DbError::from)?;
            if let Some(bytes) = self.transactions.get(&tx_id).map_err(DbError::from)? {
                out.push(decode(&bytes)?);
            }
        }
        Ok(out)
    }

    /// Number of stored transaction records.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Block until all pending writes are durable.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn finish(&self, id: Uuid, result: Result<(), TransactionError<Abort>>) -> Result<(), StoreError> {
        match result {
            Ok(()) => {
                self.flush()?;
                Ok(())
            }
            Err(TransactionError::Abort(Abort::Duplicate)) => Err(StoreError::Duplicate(id)),
            Err(TransactionError::Abort(Abort::NotFound)) => Err(StoreError::NotFound(id)),
            Err(TransactionError::Abort(Abort::Conflict)) => Err(StoreError::Conflict(id)),
            Err(TransactionError::Abort(Abort::Corrupt(reason))) => {
                Err(DbError::Serialization(reason).into())
            }
            Err(TransactionError::Storage(e)) => Err(DbError::Sled(e).into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Sender index keys
// ---------------------------------------------------------------------------

fn sender_prefix(sender: &SenderId) -> Vec<u8> {
    let bytes = sender.as_bytes();
    // SenderId is bounded well below u16::MAX.
    let len = u16::try_from(bytes.len()).unwrap_or(u16::MAX);
    let mut prefix = Vec::with_capacity(2 + bytes.len());
    prefix.extend_from_slice(&len.to_be_bytes());
    prefix.extend_from_slice(bytes);
    prefix
}

fn sender_index_key(sender: &SenderId, tx: &Transaction) -> Vec<u8> {
    let mut key = sender_prefix(sender);
    // Flip the sign bit so that signed timestamps sort correctly as bytes.
    let created = (tx.created_at().timestamp_micros() as u64) ^ (1 << 63);
    key.extend_from_slice(&created.to_be_bytes());
    key.extend_from_slice(tx.id().as_bytes());
    key
}

// ---------------------------------------------------------------------------
// Async store
// ---------------------------------------------------------------------------

async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
}

#[async_trait]
impl TransactionStore for PaySignDb {
    async fn insert(&self, tx: &Transaction) -> Result<(), StoreError> {
        let db = self.clone();
        let tx = tx.clone();
        blocking(move || db.insert_transaction(&tx)).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Transaction>, StoreError> {
        let db = self.clone();
        blocking(move || db.get_transaction(id)).await
    }

    async fn compare_and_swap(
        &self,
        expected: &Transaction,
        updated: &Transaction,
    ) -> Result<(), StoreError> {
        let db = self.clone();
        let expected = expected.clone();
        let updated = updated.clone();
        blocking(move || db.swap_transaction(&expected, &updated)).await
    }

    async fn list_by_sender(&self, sender: &SenderId) -> Result<Vec<Transaction>, StoreError> {
        let db = self.clone();
        let sender = sender.clone();
        blocking(move || db.transactions_by_sender(&sender)).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
