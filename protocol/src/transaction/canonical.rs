//! Canonical payload serialization.
//!
//! The payer's wallet and this crate must hash exactly the same bytes, or
//! every honest signature fails. This module pins those bytes down:
//!
//! ```text
//! {"Id":"<uuid>","Type":"Payment","RecipientDid":"<recipient>","Amount":"12.50000000","Currency":"EUR"}
//! ```
//!
//! - Compact JSON, no whitespace, keys in exactly this order.
//! - `Type` is the variant name, never an ordinal.
//! - `Amount` has exactly eight fractional digits, `.` separator, no
//!   grouping, independent of any locale.
//! - Metadata is not part of the signed content.
//! - Strings are escaped only where JSON requires it (`"`, `\`, control
//!   characters). No HTML-safe or `\uXXXX` escaping of non-ASCII text.
//!
//! This is canonical format version
//! [`CANONICAL_FORMAT_VERSION`](crate::config::CANONICAL_FORMAT_VERSION). Any
//! change to the field set, the order, or the formatting rules is a new
//! version.

use serde::Serialize;
use thiserror::Error;

use super::payload::TransactionPayload;
use crate::config::AMOUNT_SCALE;
use crate::crypto::hash::sha256_hex;

/// Errors raised while canonicalizing a payload.
///
/// None of these are expected for payloads built through
/// [`super::PayloadBuilder`]; they exist so a corrupted record fails loudly
/// instead of being signed or verified in a truncated form.
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// The amount cannot be rendered with exactly eight fractional digits.
    #[error("amount {0} cannot be rendered with {AMOUNT_SCALE} fractional digits")]
    AmountNotRepresentable(String),

    /// JSON serialization failed.
    #[error("canonical serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Field layout of canonical format version 1. Declaration order is the
/// serialization order.
#[derive(Serialize)]
struct CanonicalPayloadV1<'a> {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Type")]
    tx_type: &'static str,
    #[serde(rename = "RecipientDid")]
    recipient: &'a str,
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Currency")]
    currency: &'a str,
}

/// Serializes a payload into the exact bytes that get signed.
///
/// Pure and deterministic: the same payload always yields the same bytes.
///
/// # Errors
///
/// Returns [`CanonicalError::AmountNotRepresentable`] if the amount does not
/// survive a round trip through the fixed eight-digit representation.
pub fn canonical_bytes(payload: &TransactionPayload) -> Result<Vec<u8>, CanonicalError> {
    let canonical = CanonicalPayloadV1 {
        id: payload.id().hyphenated().to_string(),
        tx_type: payload.tx_type().as_str(),
        recipient: payload.recipient(),
        amount: fixed_point_amount(payload)?,
        currency: payload.currency().as_str(),
    };

    Ok(serde_json::to_vec(&canonical)?)
}

/// Hex-encoded SHA-256 of the canonical bytes.
///
/// Used in logs to correlate what was verified without writing the payload
/// itself to the log stream.
pub fn canonical_digest(payload: &TransactionPayload) -> Result<String, CanonicalError> {
    Ok(sha256_hex(&canonical_bytes(payload)?))
}

/// Renders the amount with exactly eight fractional digits.
fn fixed_point_amount(payload: &TransactionPayload) -> Result<String, CanonicalError> {
    let value = payload.amount().value();
    let mut fixed = value;
    fixed.rescale(AMOUNT_SCALE);

    if fixed.scale() != AMOUNT_SCALE || fixed != value {
        return Err(CanonicalError::AmountNotRepresentable(value.to_string()));
    }

    let rendered = fixed.to_string();
    // Decimal's Display never groups digits; this guards against that ever
    // changing underneath us.
    if rendered.contains(',') {
        return Err(CanonicalError::AmountNotRepresentable(rendered));
    }
    Ok(rendered)
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
    use std::str::FromStr;
    use uuid::Uuid;

    const FIXED_ID: &str = "6f1c2b9e-3d4a-4c7e-9a51-2f0e8d7c6b5a";

    fn payload(recipient: &str, amount: &str, currency: &str) -> TransactionPayload {
        PayloadBuilder::new(TransactionType::Payment)
            .id(Uuid::parse_str(FIXED_ID).unwrap())
            .recipient(recipient)
            .amount(Decimal::from_str(amount).unwrap())
            .currency(currency)
            .metadata(Some("{\"note\":\"not signed\"}".into()))
            .build()
            .unwrap()
    }

    #[test]
    fn produces_exact_v1_layout() {
        let p = payload("did:example:merchant", "12.5", "EUR");
        let bytes = canonical_bytes(&p).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            format!(
                "{{\"Id\":\"{}\",\"Type\":\"Payment\",\"RecipientDid\":\"did:example:merchant\",\"Amount\":\"12.50000000\",\"Currency\":\"EUR\"}}",
                FIXED_ID
            )
        );
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let p = payload("did:example:merchant", "7.25", "USD");
        assert_eq!(canonical_bytes(&p).unwrap(), canonical_bytes(&p).unwrap());
    }

    #[test]
    fn metadata_is_not_signed() {
        let with = payload("did:example:merchant", "1", "EUR");
        let without = PayloadBuilder::new(TransactionType::Payment)
            .id(with.id())
            .recipient("did:example:merchant")
            .amount(Decimal::ONE)
            .currency("EUR")
            .build()
            .unwrap();
        assert_eq!(
            canonical_bytes(&with).unwrap(),
            canonical_bytes(&without).unwrap()
        );
    }

    #[test]
    fn every_signed_field_changes_the_bytes() {
        let base = canonical_bytes(&payload("did:example:a", "12.5", "EUR")).unwrap();
        assert_ne!(
            base,
            canonical_bytes(&payload("did:example:b", "12.5", "EUR")).unwrap()
        );
        assert_ne!(
            base,
            canonical_bytes(&payload("did:example:a", "12.50000001", "EUR")).unwrap()
        );
        assert_ne!(
            base,
            canonical_bytes(&payload("did:example:a", "12.5", "USD")).unwrap()
        );
    }

    #[test]
    fn type_is_rendered_by_name() {
        let p = PayloadBuilder::new(TransactionType::ValueAddedService)
            .recipient("r")
            .amount(Decimal::ONE)
            .currency("EUR")
            .build()
            .unwrap();
        let s = String::from_utf8(canonical_bytes(&p).unwrap()).unwrap();
        assert!(s.contains("\"Type\":\"ValueAddedService\""));
    }

    #[test]
    fn non_ascii_and_html_characters_are_not_escaped() {
        let p = payload("did:example:café<&>", "1", "EUR");
        let s = String::from_utf8(canonical_bytes(&p).unwrap()).unwrap();
        assert!(s.contains("did:example:café<&>"));
        assert!(!s.contains("\\u"));
    }

    #[test]
    fn quotes_are_escaped_as_json_requires() {
        let p = payload("did:\"quoted\"", "1", "EUR");
        let s = String::from_utf8(canonical_bytes(&p).unwrap()).unwrap();
        assert!(s.contains("\"RecipientDid\":\"did:\\\"quoted\\\"\""));
    }

    #[test]
    fn large_amounts_keep_eight_digits_without_grouping() {
        let p = payload("r", "1234567890.12345678", "EUR");
        let s = String::from_utf8(canonical_bytes(&p).unwrap()).unwrap();
        assert!(s.contains("\"Amount\":\"1234567890.12345678\""));
    }

    #[test]
    fn digest_is_hex_sha256() {
        let p = payload("did:example:merchant", "12.5", "EUR");
        let digest = canonical_digest(&p).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, canonical_digest(&p).unwrap());
    }
}
