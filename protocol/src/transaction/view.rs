//! Wire representation of a transaction.
//!
//! `TransactionView` is what the HTTP API returns and what wallets parse. It
//! is a flat, camelCase projection of [`Transaction`]; the tagged-union state
//! is collapsed into `status` plus an optional `senderIdentifier`. The
//! signature itself is not echoed back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payload::TransactionPayload;
use super::state::Transaction;
use super::types::{TransactionStatus, TransactionType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: Uuid,
    pub sender_identifier: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub payload: PayloadView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadView {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub recipient_identifier: String,
    pub currency: String,
    /// Fixed eight-decimal string, e.g. `"12.50000000"`.
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl From<&TransactionPayload> for PayloadView {
    fn from(payload: &TransactionPayload) -> Self {
        Self {
            id: payload.id(),
            tx_type: payload.tx_type(),
            recipient_identifier: payload.recipient().to_string(),
            currency: payload.currency().to_string(),
            amount: payload.amount().to_fixed_string(),
            metadata: payload.metadata().map(str::to_string),
        }
    }
}

impl From<&Transaction> for TransactionView {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id(),
            sender_identifier: tx.sender().map(|s| s.as_str().to_string()),
            status: tx.status(),
            created_at: tx.created_at(),
            modified_at: tx.modified_at(),
            payload: PayloadView::from(tx.payload()),
        }
    }
}
