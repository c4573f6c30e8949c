//! Offer payload construction via the builder pattern.
//!
//! The [`PayloadBuilder`] collects raw caller input, and `.build()` validates
//! all of it at once, returning an immutable [`TransactionPayload`] with a
//! freshly generated ID. A payload that exists is a payload that passed
//! validation; there are no setters to undo that.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{Amount, Currency, PayloadError, TransactionType};
use crate::config::{MAX_METADATA_LENGTH, MAX_RECIPIENT_LENGTH};

// ---------------------------------------------------------------------------
// TransactionPayload
// ---------------------------------------------------------------------------

/// The commercial content of an offer: who gets paid, how much, in what.
///
/// Every field except `metadata` is covered by the payer's signature (see
/// [`super::canonical`]). Fields are private and only readable, so the
/// signed content cannot drift after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPayload {
    id: Uuid,
    tx_type: TransactionType,
    recipient: String,
    amount: Amount,
    currency: Currency,
    metadata: Option<String>,
    created_at: DateTime<Utc>,
}

impl TransactionPayload {
    /// Unique payload ID, generated at creation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The kind of payment.
    pub fn tx_type(&self) -> TransactionType {
        self.tx_type
    }

    /// Identifier of the party being paid (typically a DID).
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Positive amount with eight-digit scale.
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Upper-case three-letter currency code.
    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Opaque, unsigned context supplied by the payee.
    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// ---------------------------------------------------------------------------
// PayloadBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`TransactionPayload`].
///
/// # Examples
///
/// ```
/// use paysign_protocol::transaction::{PayloadBuilder, TransactionType};
/// use rust_decimal::Decimal;
///
/// let payload = PayloadBuilder::new(TransactionType::Payment)
///     .recipient("did:example:merchant")
///     .amount(Decimal::new(1250, 2))
///     .currency("EUR")
///     .build()
///     .unwrap();
///
/// assert_eq!(payload.amount().to_fixed_string(), "12.50000000");
/// ```
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    tx_type: TransactionType,
    recipient: String,
    amount: Decimal,
    currency: String,
    metadata: Option<String>,
    id: Option<Uuid>,
    created_at: Option<DateTime<Utc>>,
}

impl PayloadBuilder {
    /// Starts a payload of the given type. Every other field must be set
    /// before `build()` succeeds.
    pub fn new(tx_type: TransactionType) -> Self {
        Self {
            tx_type,
            recipient: String::new(),
            amount: Decimal::ZERO,
            currency: String::new(),
            metadata: None,
            id: None,
            created_at: None,
        }
    }

    pub fn recipient(mut self, recipient: &str) -> Self {
        self.recipient = recipient.to_string();
        self
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = amount;
        self
    }

    pub fn currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_string();
        self
    }

    /// Attaches unsigned metadata. Empty strings are treated as absent.
    pub fn metadata(mut self, metadata: Option<String>) -> Self {
        self.metadata = metadata.filter(|m| !m.is_empty());
        self
    }

    /// Pins the payload ID instead of generating one. Used by tests and
    /// fixtures that need stable canonical bytes.
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Pins the creation time instead of using the current clock.
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Validates every field and produces the immutable payload.
    ///
    /// Checks, in order: recipient non-empty and bounded, amount positive
    /// with at most eight fractional digits, currency three letters,
    /// metadata bounded.
    pub fn build(self) -> Result<TransactionPayload, PayloadError> {
        let recipient = self.recipient.trim();
        if recipient.is_empty() {
            return Err(PayloadError::EmptyRecipient);
        }
        if recipient.len() > MAX_RECIPIENT_LENGTH {
            return Err(PayloadError::RecipientTooLong {
                len: recipient.len(),
                max: MAX_RECIPIENT_LENGTH,
            });
        }

        let amount = Amount::new(self.amount)?;
        let currency = Currency::new(&self.currency)?;

        if let Some(ref metadata) = self.metadata {
            if metadata.len() > MAX_METADATA_LENGTH {
                return Err(PayloadError::MetadataTooLong {
                    len: metadata.len(),
                    max: MAX_METADATA_LENGTH,
                });
            }
        }

        Ok(TransactionPayload {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            tx_type: self.tx_type,
            recipient: recipient.to_string(),
            amount,
            currency,
            metadata: self.metadata,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
