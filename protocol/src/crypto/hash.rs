//! # Hashing Utilities
//!
//! SHA-256 is the only digest in PaySign. ECDSA P-256 signatures are computed
//! over the SHA-256 of the canonical payload (the `p256` crate does that
//! internally), and the same digest, hex-encoded, is what gets written to the
//! logs when we need to say *which* payload was verified without printing it.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
///
/// # Example
///
/// ```
/// use paysign_protocol::crypto::sha256;
///
/// let hash = sha256(b"PaySign");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 of the input, lower-case hex encoded (64 characters).
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        // FIPS 180-2 test vector for "abc".
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256_hex_matches_raw() {
        let data = b"offer";
        assert_eq!(sha256_hex(data), hex::encode(sha256(data)));
    }
}
