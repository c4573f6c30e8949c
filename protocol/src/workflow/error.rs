//! The one error type the workflow service returns.

use thiserror::Error;

use crate::identity::{LookupError, SenderIdError};
use crate::storage::StoreError;
use crate::transaction::{CanonicalError, PayloadError, StateError};

/// Outcome classes of a failed workflow call.
///
/// `Internal` keeps its detail for the logs; outer layers should show the
/// caller a generic message instead.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Bad input. Nothing was written.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown transaction.
    #[error("{0}")]
    NotFound(String),

    /// The request is not legal in the transaction's current state, or the
    /// signature did not verify.
    #[error("{0}")]
    InvalidState(String),

    /// Persistence, lookup or encoding failure.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Returned when the signature does not verify against the registered key.
pub const INVALID_SIGNATURE: &str = "invalid signature";

/// Returned when the sender has no registered key.
pub const UNKNOWN_SENDER_KEY: &str = "sender or key not found";

/// Returned when the signature is not Base64URL-encoded DER.
pub const MALFORMED_SIGNATURE: &str = "malformed signature encoding";

impl WorkflowError {
    /// True for the `InvalidState` outcomes of a signature that was checked
    /// and refused. These leave the transaction Failed.
    pub fn is_signature_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidState(msg)
                if msg == INVALID_SIGNATURE || msg == UNKNOWN_SENDER_KEY || msg == MALFORMED_SIGNATURE
        )
    }

    /// Short machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::InvalidState(_) => "invalid_state",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<PayloadError> for WorkflowError {
    fn from(e: PayloadError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<SenderIdError> for WorkflowError {
    fn from(e: SenderIdError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<StateError> for WorkflowError {
    fn from(e: StateError) -> Self {
        Self::InvalidState(e.to_string())
    }
}

impl From<StoreError> for WorkflowError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<LookupError> for WorkflowError {
    fn from(e: LookupError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<CanonicalError> for WorkflowError {
    fn from(e: CanonicalError) -> Self {
        Self::Internal(e.to_string())
    }
}
