//! # Storage Module
//!
//! Persistence for transaction records.
//!
//! ## Architecture
//!
//! ```text
//! store.rs: TransactionStore trait, the boundary the workflow depends on
//! db.rs   : PaySignDb, the sled implementation of that boundary
//! ```
//!
//! ## Design Decisions
//!
//! 1. **Compare-and-swap, not locks.** Updates carry the snapshot they were
//!    derived from. A concurrent writer makes the swap fail instead of being
//!    silently overwritten, which is what guarantees at-most-once completion.
//!
//! 2. **Bincode for on-disk serialization.** Compact and deterministic. JSON
//!    is for the API and the canonical payload; bincode is for storage.
//!
//! 3. **sled I/O off the async runtime.** Every trait method runs the sled
//!    call inside `spawn_blocking`.

pub mod db;
pub mod store;

pub use db::{DbError, DbResult, PaySignDb};
pub use store::{StoreError, TransactionStore};
