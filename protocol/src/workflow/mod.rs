//! # Workflow Module
//!
//! The only layer allowed to change persisted state, and the only layer that
//! turns lower-level errors into caller-facing outcomes.
//!
//! ```text
//! service.rs: TransactionService (create_offer, get_by_id, sign_and_complete,
//!             fail, list_by_sender)
//! error.rs  : WorkflowError { Validation, NotFound, InvalidState, Internal }
//! ```

pub mod error;
pub mod service;

pub use error::WorkflowError;
pub use service::TransactionService;
