//! # Protocol Configuration & Constants
//!
//! Every constant that shapes the signed-offer protocol lives here. The
//! canonical format in particular is a contract with every wallet that has
//! ever signed an offer, so the values below change only together with
//! [`CANONICAL_FORMAT_VERSION`].

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Crate-level protocol version string reported by the node.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Version of the canonical payload serialization.
///
/// Version 1 signs `Id`, `Type`, `RecipientDid`, `Amount` and `Currency`, in
/// that order, and excludes metadata. Changing the field set, the order or
/// the number formatting is a breaking change and bumps this number.
pub const CANONICAL_FORMAT_VERSION: u16 = 1;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// ECDSA over NIST P-256 with SHA-256 digests. This is what the secure
/// enclaves on both mobile platforms produce, so it is what we verify.
pub const SIGNATURE_ALGORITHM: &str = "ECDSA-P256-SHA256";

/// Public key encoding accepted by the verifier: standard Base64 of a DER
/// SubjectPublicKeyInfo.
pub const PUBLIC_KEY_ENCODING: &str = "base64(der-spki)";

/// Signature encoding accepted by the verifier: URL-safe Base64 (padding
/// optional) of an ASN.1/DER `ECDSA-Sig-Value` sequence.
pub const SIGNATURE_ENCODING: &str = "base64url(der-ecdsa)";

/// Upper bound on a DER-encoded P-256 signature. Two 33-byte integers plus
/// sequence and integer headers never exceed 72 bytes.
pub const MAX_DER_SIGNATURE_LENGTH: usize = 72;

// ---------------------------------------------------------------------------
// Payload Limits
// ---------------------------------------------------------------------------

/// Number of fractional digits carried by every amount, and the exact number
/// rendered in the canonical payload.
pub const AMOUNT_SCALE: u32 = 8;

/// ISO-4217 style currency codes are exactly three letters.
pub const CURRENCY_CODE_LENGTH: usize = 3;

/// Maximum recipient identifier length in bytes. DIDs are short; anything
/// longer is a client bug.
pub const MAX_RECIPIENT_LENGTH: usize = 512;

/// Maximum sender identifier length in bytes.
pub const MAX_SENDER_LENGTH: usize = 512;

/// Maximum metadata length in bytes. Metadata is unsigned context, not a
/// document store.
pub const MAX_METADATA_LENGTH: usize = 4 * 1024;

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default HTTP API port.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 9090;

/// Default data directory for the embedded database.
pub const DEFAULT_DATA_DIR: &str = "./paysign-data";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_scale_matches_canonical_format() {
        // Version 1 renders eight fractional digits. A different scale
        // needs a new canonical version.
        assert_eq!(CANONICAL_FORMAT_VERSION, 1);
        assert_eq!(AMOUNT_SCALE, 8);
    }

    #[test]
    fn test_default_ports_are_distinct() {
        assert_ne!(DEFAULT_HTTP_PORT, DEFAULT_METRICS_PORT);
    }

    #[test]
    fn test_payload_limits_sanity() {
        assert_eq!(CURRENCY_CODE_LENGTH, 3);
        assert!(MAX_RECIPIENT_LENGTH > 0);
        assert!(MAX_SENDER_LENGTH > 0);
        assert!(MAX_METADATA_LENGTH > MAX_RECIPIENT_LENGTH);
    }
}
