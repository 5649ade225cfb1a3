mod memory;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use memory::MemorySecretStore;

use crate::{
    error::{KeyError, Result},
    key::PrivateKey,
};

/// Secret data entry holding the PEM-encoded private key
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

/// A namespaced secret as served by the secret lookup service
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Secret {
    pub namespace: String,
    pub name: String,
    pub data: BTreeMap<String, Vec<u8>>,
}

impl Secret {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            data: BTreeMap::new(),
        }
    }

    /// Set a data entry
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Read access to secrets (synchronous).
///
/// Implementations are expected to serve from a local cache; a missing secret
/// must be reported as [`KeyError::NotFound`].
pub trait SecretStore: Send + Sync {
    fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret>;
}

/// Resolves a private key referenced by a namespace-scoped name
pub trait KeyResolver: Send + Sync {
    fn resolve_key(&self, namespace: &str, name: &str) -> Result<PrivateKey>;
}

/// Key resolver reading the `tls.key` entry of a secret
pub struct SecretKeyResolver<S> {
    store: S,
}

impl<S: SecretStore> SecretKeyResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: SecretStore> KeyResolver for SecretKeyResolver<S> {
    fn resolve_key(&self, namespace: &str, name: &str) -> Result<PrivateKey> {
        let secret = self.store.get_secret(namespace, name)?;

        let key_bytes = secret.data.get(TLS_PRIVATE_KEY_KEY).ok_or_else(|| {
            KeyError::invalid_data(format!(
                "no data for {TLS_PRIVATE_KEY_KEY:?} in secret '{namespace}/{name}'"
            ))
        })?;

        let pem = std::str::from_utf8(key_bytes).map_err(|e| {
            KeyError::invalid_data(format!("key data in secret '{namespace}/{name}' is not UTF-8: {e}"))
        })?;

        let key = PrivateKey::from_pem(pem)?;
        debug!(namespace, name, algorithm = %key.algorithm(), "resolved private key from secret");
        Ok(key)
    }
}

impl<T: KeyResolver + ?Sized> KeyResolver for std::sync::Arc<T> {
    fn resolve_key(&self, namespace: &str, name: &str) -> Result<PrivateKey> {
        (**self).resolve_key(namespace, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(secret: Secret) -> MemorySecretStore {
        let store = MemorySecretStore::new();
        store.insert_secret(secret).unwrap();
        store
    }

    #[test]
    fn test_resolve_key_from_secret() {
        let key = PrivateKey::ed25519_from_seed(&[9u8; 32]);
        let pem = key.to_pkcs8_pem().unwrap();
        let secret = Secret::new("default", "tls-key").with_data(TLS_PRIVATE_KEY_KEY, pem);
        let resolver = SecretKeyResolver::new(store_with(secret));

        let resolved = resolver.resolve_key("default", "tls-key").unwrap();
        assert_eq!(resolved.public_key().unwrap(), key.public_key().unwrap());
    }

    #[test]
    fn test_missing_secret_is_not_found() {
        let resolver = SecretKeyResolver::new(MemorySecretStore::new());
        let err = resolver.resolve_key("default", "absent").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_missing_or_garbage_key_data_is_invalid() {
        let secret = Secret::new("default", "empty");
        let resolver = SecretKeyResolver::new(store_with(secret));
        assert!(resolver.resolve_key("default", "empty").unwrap_err().is_invalid_data());

        let secret = Secret::new("default", "garbage").with_data(TLS_PRIVATE_KEY_KEY, "garbage");
        let resolver = SecretKeyResolver::new(store_with(secret));
        assert!(resolver.resolve_key("default", "garbage").unwrap_err().is_invalid_data());
    }

    #[test]
    fn test_secrets_are_namespace_scoped() {
        let key = PrivateKey::ed25519_from_seed(&[4u8; 32]);
        let secret = Secret::new("team-a", "tls-key")
            .with_data(TLS_PRIVATE_KEY_KEY, key.to_pkcs8_pem().unwrap());
        let resolver = SecretKeyResolver::new(store_with(secret));

        assert!(resolver.resolve_key("team-a", "tls-key").is_ok());
        assert!(resolver.resolve_key("team-b", "tls-key").unwrap_err().is_not_found());
    }
}
