//! # Key Registry
//!
//! Maps a sender identifier to the P-256 public key its wallet registered.
//! This is the only way the workflow learns which key a signature must
//! verify under.
//!
//! The mapping is explicit: the full identifier string is the key in the
//! `identities` tree. Nothing is derived from the identifier's structure.
//!
//! ## Operations
//!
//! - [`KeyRegistry::register`]: first registration; duplicates are rejected.
//! - [`KeyRegistry::rotate`]: replace the key of an existing identity.
//! - [`IdentityLookup::resolve_public_key`]: what the workflow calls.
//!
//! Keys are validated on the way in: anything that does not decode as a
//! P-256 SubjectPublicKeyInfo is refused at registration time instead of
//! failing every signature later.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Tree;
use thiserror::Error;
use tracing::info;

use super::sender::SenderId;
use crate::crypto::verifier::decode_public_key;
use crate::storage::db::{decode, encode, DbError, PaySignDb, IDENTITIES_TREE};

// ---------------------------------------------------------------------------
// Lookup boundary
// ---------------------------------------------------------------------------

/// The lookup backend could not answer.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("identity backend failed: {0}")]
    Backend(String),
}

/// Resolves a sender identifier to its registered public key.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// Standard Base64 of the DER SubjectPublicKeyInfo, or `None` if the
    /// sender is unknown.
    async fn resolve_public_key(&self, sender: &SenderId) -> Result<Option<String>, LookupError>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Errors from registry mutations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("identity {0} is already registered")]
    AlreadyRegistered(String),

    #[error("identity {0} is not registered")]
    UnknownIdentity(String),

    #[error("public key is not a base64 DER P-256 SubjectPublicKeyInfo")]
    InvalidPublicKey,

    #[error(transparent)]
    Db(#[from] DbError),
}

/// A registered key and its history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredKey {
    /// Standard Base64 of the DER SubjectPublicKeyInfo.
    pub public_key: String,
    pub registered_at: DateTime<Utc>,
    /// Set the last time the key was replaced.
    pub rotated_at: Option<DateTime<Utc>>,
}

/// sled-backed sender → key registry.
#[derive(Debug, Clone)]
pub struct KeyRegistry {
    identities: Tree,
}

impl KeyRegistry {
    /// Opens the `identities` tree of an existing database.
    pub fn open(db: &PaySignDb) -> Result<Self, RegistryError> {
        Ok(Self {
            identities: db.open_tree(IDENTITIES_TREE)?,
        })
    }

    /// Register `public_key_b64` for `sender`. Blocking.
    pub fn register(
        &self,
        sender: &SenderId,
        public_key_b64: &str,
    ) -> Result<RegisteredKey, RegistryError> {
        let public_key = validated_key(public_key_b64)?;
        let record = RegisteredKey {
            public_key,
            registered_at: Utc::now(),
            rotated_at: None,
        };
        let bytes = encode(&record)?;

        let swapped = self
            .identities
            .compare_and_swap(sender.as_bytes(), None as Option<&[u8]>, Some(bytes))
            .map_err(DbError::from)?;
        if swapped.is_err() {
            return Err(RegistryError::AlreadyRegistered(sender.to_string()));
        }
        self.identities.flush().map_err(DbError::from)?;

        info!(sender = %sender, "identity registered");
        Ok(record)
    }

    /// Replace the key of an already registered sender. Blocking.
    pub fn rotate(
        &self,
        sender: &SenderId,
        public_key_b64: &str,
    ) -> Result<RegisteredKey, RegistryError> {
        let public_key = validated_key(public_key_b64)?;

        loop {
            let Some(current_bytes) = self.identities.get(sender.as_bytes()).map_err(DbError::from)?
            else {
                return Err(RegistryError::UnknownIdentity(sender.to_string()));
            };
            let current: RegisteredKey = decode(&current_bytes)?;
            let record = RegisteredKey {
                public_key: public_key.clone(),
                registered_at: current.registered_at,
                rotated_at: Some(Utc::now()),
            };
            let bytes = encode(&record)?;

            let swapped = self
                .identities
                .compare_and_swap(sender.as_bytes(), Some(current_bytes), Some(bytes))
                .map_err(DbError::from)?;
            if swapped.is_ok() {
                self.identities.flush().map_err(DbError::from)?;
                info!(sender = %sender, "identity key rotated");
                return Ok(record);
            }
            // Lost a race with another rotation; re-read and try again.
        }
    }

    /// The current record for `sender`, if any. Blocking.
    pub fn get(&self, sender: &SenderId) -> Result<Option<RegisteredKey>, RegistryError> {
        match self.identities.get(sender.as_bytes()).map_err(DbError::from)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Number of registered identities.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

fn validated_key(public_key_b64: &str) -> Result<String, RegistryError> {
    let trimmed = public_key_b64.trim();
    decode_public_key(trimmed).map_err(|_| RegistryError::InvalidPublicKey)?;
    Ok(trimmed.to_string())
}

#[async_trait]
impl IdentityLookup for KeyRegistry {
    async fn resolve_public_key(&self, sender: &SenderId) -> Result<Option<String>, LookupError> {
        let registry = self.clone();
        let sender = sender.clone();
        tokio::task::spawn_blocking(move || registry.get(&sender))
            .await
            .map_err(|e| LookupError::Backend(e.to_string()))?
            .map(|record| record.map(|r| r.public_key))
            .map_err(|e| LookupError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{DeviceKey, SignatureProvider};

    fn registry() -> KeyRegistry {
        KeyRegistry::open(&PaySignDb::open_temporary().unwrap()).unwrap()
    }

    fn sender(s: &str) -> SenderId {
        SenderId::new(s).unwrap()
    }

    #[test]
    fn register_and_get() {
        let reg = registry();
        let key = DeviceKey::generate().unwrap();
        let alice = sender("did:paysign:wallet.example:alice");

        let record = reg.register(&alice, &key.public_key_spki_b64()).unwrap();
        assert_eq!(record.public_key, key.public_key_spki_b64());
        assert!(record.rotated_at.is_none());
        assert_eq!(reg.get(&alice).unwrap(), Some(record));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn duplicate_registration_rejected() {
        let reg = registry();
        let alice = sender("did:alice");
        let k1 = DeviceKey::generate().unwrap();
        let k2 = DeviceKey::generate().unwrap();
        reg.register(&alice, &k1.public_key_spki_b64()).unwrap();

        match reg.register(&alice, &k2.public_key_spki_b64()) {
            Err(RegistryError::AlreadyRegistered(_)) => {}
            other => panic!("expected AlreadyRegistered, got {:?}", other),
        }
        assert_eq!(
            reg.get(&alice).unwrap().unwrap().public_key,
            k1.public_key_spki_b64()
        );
    }

    #[test]
    fn invalid_key_rejected() {
        let reg = registry();
        match reg.register(&sender("did:alice"), "bm90IGEga2V5") {
            Err(RegistryError::InvalidPublicKey) => {}
            other => panic!("expected InvalidPublicKey, got {:?}", other),
        }
        assert!(reg.is_empty());
    }

    #[test]
    fn rotate_replaces_key_and_keeps_registration_time() {
        let reg = registry();
        let alice = sender("did:alice");
        let old = DeviceKey::generate().unwrap();
        let new = DeviceKey::generate().unwrap();
        let first = reg.register(&alice, &old.public_key_spki_b64()).unwrap();

        let rotated = reg.rotate(&alice, &new.public_key_spki_b64()).unwrap();
        assert_eq!(rotated.public_key, new.public_key_spki_b64());
        assert_eq!(rotated.registered_at, first.registered_at);
        assert!(rotated.rotated_at.is_some());
    }

    #[test]
    fn rotate_unknown_identity_rejected() {
        let reg = registry();
        let key = DeviceKey::generate().unwrap();
        match reg.rotate(&sender("did:nobody"), &key.public_key_spki_b64()) {
            Err(RegistryError::UnknownIdentity(_)) => {}
            other => panic!("expected UnknownIdentity, got {:?}", other),
        }
    }

    #[test]
    fn identifiers_are_opaque() {
        // Two identifiers that share every delimiter-separated segment but
        // the last are distinct identities.
        let reg = registry();
        let key = DeviceKey::generate().unwrap();
        reg.register(&sender("did:paysign:host:42"), &key.public_key_spki_b64())
            .unwrap();
        assert!(reg.get(&sender("did:paysign:other:42")).unwrap().is_none());
    }

    #[tokio::test]
    async fn lookup_resolves_registered_key() {
        let reg = registry();
        let key = DeviceKey::generate().unwrap();
        let alice = sender("did:alice");
        reg.register(&alice, &key.public_key_spki_b64()).unwrap();

        let lookup: &dyn IdentityLookup = &reg;
        assert_eq!(
            lookup.resolve_public_key(&alice).await.unwrap(),
            Some(key.public_key_spki_b64())
        );
        assert_eq!(
            lookup.resolve_public_key(&sender("did:bob")).await.unwrap(),
            None
        );
    }
}
