//! Core type definitions for PaySign transactions.
//!
//! These types form the vocabulary of every offer. Validation happens at
//! construction, so a value of any of these types is always well-formed:
//! there is no such thing as a negative [`Amount`] or a four-letter
//! [`Currency`] once you hold one.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{AMOUNT_SCALE, CURRENCY_CODE_LENGTH};

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// Input rejected while building a payload.
///
/// Every variant is a caller mistake. Nothing is persisted when one of these
/// is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// The recipient identifier is empty or whitespace.
    #[error("recipient identifier cannot be empty")]
    EmptyRecipient,

    /// The recipient identifier exceeds the configured maximum length.
    #[error("recipient identifier is {len} bytes, maximum is {max}")]
    RecipientTooLong { len: usize, max: usize },

    /// The amount is zero or negative.
    #[error("amount must be greater than zero, got {0}")]
    NonPositiveAmount(String),

    /// The amount carries more fractional digits than the protocol signs.
    #[error("amount {value} has {scale} fractional digits, maximum is {max}")]
    TooManyFractionalDigits { value: String, scale: u32, max: u32 },

    /// The amount is too large to be rendered with a fixed eight-digit scale.
    #[error("amount {0} is out of range")]
    AmountOutOfRange(String),

    /// The amount string could not be parsed as a decimal.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The currency is not exactly three ASCII letters.
    #[error("invalid currency code '{0}': expected exactly three letters")]
    InvalidCurrency(String),

    /// The metadata exceeds the configured maximum length.
    #[error("metadata is {len} bytes, maximum is {max}")]
    MetadataTooLong { len: usize, max: usize },
}

// ---------------------------------------------------------------------------
// TransactionType
// ---------------------------------------------------------------------------

/// What kind of payment an offer represents.
///
/// The variant *name* is part of the signed canonical payload. Never rename a
/// variant; add new ones at the end and bump the canonical format version if
/// the set of names a verifier must accept changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// One-off payment for goods or services.
    Payment,
    /// Person-to-person transfer.
    Transfer,
    /// Recurring charge authorised once.
    Subscription,
    /// Top-ups, vouchers and other value-added services.
    ValueAddedService,
}

impl TransactionType {
    /// The stable name used in the canonical payload and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "Payment",
            Self::Transfer => "Transfer",
            Self::Subscription => "Subscription",
            Self::ValueAddedService => "ValueAddedService",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TransactionStatus
// ---------------------------------------------------------------------------

/// Flat view of a transaction's lifecycle state.
///
/// The state machine itself lives in [`super::state::TransactionState`];
/// this enum is what callers compare against and what goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Offer created, waiting for the payer's signature.
    Pending,
    /// Signature verified. Terminal.
    Completed,
    /// Rejected or abandoned. Terminal.
    Failed,
}

impl TransactionStatus {
    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// A three-letter currency code, stored upper-case.
///
/// The protocol does not keep a list of known currencies; it only
/// guarantees the shape of the code. `"eur"` is accepted and stored as
/// `"EUR"`, so the signed payload always carries the normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Validates and normalizes a currency code.
    pub fn new(code: &str) -> Result<Self, PayloadError> {
        let trimmed = code.trim();
        if trimmed.len() != CURRENCY_CODE_LENGTH
            || !trimmed.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(PayloadError::InvalidCurrency(code.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// The normalized code, e.g. `"EUR"`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Currency {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = PayloadError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// A strictly positive fixed-point amount with at most eight fractional
/// digits.
///
/// Backed by [`rust_decimal::Decimal`], never by a float. The value is held
/// at exactly [`AMOUNT_SCALE`] digits so that `12.5` and `12.50000000` are
/// the same amount and render the same way.
///
/// Serializes as its fixed-point string (`"12.50000000"`) in every format,
/// which keeps JSON lossless and bincode independent of `Decimal`'s internal
/// layout.
///
/// # Examples
///
/// ```
/// use paysign_protocol::transaction::types::Amount;
///
/// let amount: Amount = "12.5".parse().unwrap();
/// assert_eq!(amount.to_fixed_string(), "12.50000000");
/// assert!("0".parse::<Amount>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(Decimal);

impl Amount {
    /// Validates a decimal value and fixes its scale to eight digits.
    pub fn new(value: Decimal) -> Result<Self, PayloadError> {
        if value <= Decimal::ZERO {
            return Err(PayloadError::NonPositiveAmount(value.to_string()));
        }

        let normalized = value.normalize();
        if normalized.scale() > AMOUNT_SCALE {
            return Err(PayloadError::TooManyFractionalDigits {
                value: value.to_string(),
                scale: normalized.scale(),
                max: AMOUNT_SCALE,
            });
        }

        // rescale() silently settles for a smaller scale when the mantissa
        // would overflow, so check that we actually got eight digits.
        let mut fixed = normalized;
        fixed.rescale(AMOUNT_SCALE);
        if fixed.scale() != AMOUNT_SCALE || fixed != normalized {
            return Err(PayloadError::AmountOutOfRange(value.to_string()));
        }

        Ok(Self(fixed))
    }

    /// The underlying decimal value, at scale eight.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Renders the amount with exactly eight fractional digits, `.` as the
    /// separator and no grouping, e.g. `"1234.50000000"`.
    pub fn to_fixed_string(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| PayloadError::InvalidAmount(format!("'{}': {}", s, e)))?;
        Self::new(value)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PayloadError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for Amount {
    type Error = PayloadError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_fixed_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_type_display_uses_names() {
        assert_eq!(TransactionType::Payment.to_string(), "Payment");
        assert_eq!(
            TransactionType::ValueAddedService.to_string(),
            "ValueAddedService"
        );
    }

    #[test]
    fn transaction_type_serializes_as_name() {
        let json = serde_json::to_string(&TransactionType::Subscription).unwrap();
        assert_eq!(json, "\"Subscription\"");
    }

    #[test]
    fn status_terminality() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(TransactionStatus::Completed.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
    }

    #[test]
    fn currency_is_normalized_to_upper_case() {
        let c = Currency::new("eur").unwrap();
        assert_eq!(c.as_str(), "EUR");
    }

    #[test]
    fn currency_rejects_wrong_length_and_non_letters() {
        assert!(Currency::new("EU").is_err());
        assert!(Currency::new("EURO").is_err());
        assert!(Currency::new("E1R").is_err());
        assert!(Currency::new("").is_err());
    }

    #[test]
    fn amount_is_rendered_with_eight_digits() {
        let a: Amount = "12.5".parse().unwrap();
        assert_eq!(a.to_fixed_string(), "12.50000000");

        let b: Amount = "1000".parse().unwrap();
        assert_eq!(b.to_fixed_string(), "1000.00000000");

        let c: Amount = "0.00000001".parse().unwrap();
        assert_eq!(c.to_fixed_string(), "0.00000001");
    }

    #[test]
    fn equal_values_with_different_scales_are_equal_amounts() {
        let a: Amount = "12.5".parse().unwrap();
        let b: Amount = "12.50000000".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_fixed_string(), b.to_fixed_string());
    }

    #[test]
    fn trailing_zeros_beyond_scale_are_accepted() {
        // Nine digits, but the ninth is a zero: the value fits.
        let a: Amount = "1.100000000".parse().unwrap();
        assert_eq!(a.to_fixed_string(), "1.10000000");
    }

    #[test]
    fn amount_rejects_zero_and_negative() {
        assert!(matches!(
            "0".parse::<Amount>(),
            Err(PayloadError::NonPositiveAmount(_))
        ));
        assert!(matches!(
            "-1.5".parse::<Amount>(),
            Err(PayloadError::NonPositiveAmount(_))
        ));
    }

    #[test]
    fn amount_rejects_nine_significant_fractional_digits() {
        match "0.000000001".parse::<Amount>() {
            Err(PayloadError::TooManyFractionalDigits { scale: 9, .. }) => {}
            other => panic!("expected TooManyFractionalDigits, got {:?}", other),
        }
    }

    #[test]
    fn amount_rejects_values_too_large_for_fixed_scale() {
        // 28 integer digits leave no room for eight fractional ones.
        let huge = "1000000000000000000000000000";
        match huge.parse::<Amount>() {
            Err(PayloadError::AmountOutOfRange(_)) => {}
            other => panic!("expected AmountOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn amount_rejects_garbage() {
        assert!(matches!(
            "twelve".parse::<Amount>(),
            Err(PayloadError::InvalidAmount(_))
        ));
    }

    #[test]
    fn amount_serializes_as_fixed_string() {
        let a: Amount = "99.99999999".parse().unwrap();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"99.99999999\"");

        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn amount_deserialization_validates() {
        assert!(serde_json::from_str::<Amount>("\"0\"").is_err());
        assert!(serde_json::from_str::<Currency>("\"EURO\"").is_err());
    }
}
