//! Payload signing.
//!
//! This is the wallet's half of the protocol: canonicalize, then hand the
//! bytes to whatever holds the key. The server never calls it outside of
//! tests and tooling, but keeping it next to the verifier guarantees both
//! sides use the same canonical bytes.

use super::canonical::{canonical_bytes, CanonicalError};
use super::payload::TransactionPayload;
use crate::crypto::SignatureProvider;

/// Sign the canonical form of `payload`.
///
/// Returns URL-safe Base64 (no padding) of the DER signature, ready to be
/// submitted to `sign_and_complete`.
pub fn sign_payload(
    payload: &TransactionPayload,
    signer: &dyn SignatureProvider,
) -> Result<String, CanonicalError> {
    let bytes = canonical_bytes(payload)?;
    Ok(signer.sign(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{verify, DeviceKey};
    use crate::transaction::payload::PayloadBuilder;
    use crate::transaction::types::TransactionType;
    use rust_decimal::Decimal;

    #[test]
    fn test_signature_covers_canonical_bytes() {
        let key = DeviceKey::generate().unwrap();
        let payload = PayloadBuilder::new(TransactionType::Transfer)
            .recipient("did:example:friend")
            .amount(Decimal::new(5, 0))
            .currency("USD")
            .build()
            .unwrap();

        let sig = sign_payload(&payload, &key).unwrap();
        let bytes = canonical_bytes(&payload).unwrap();
        assert!(verify(&key.public_key_spki_b64(), &bytes, &sig));
    }
}
