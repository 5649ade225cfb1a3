use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use super::{Secret, SecretStore};
use crate::error::{KeyError, Result};

/// Type alias for the secret storage map, keyed by (namespace, name)
type SecretStorage = Arc<RwLock<HashMap<(String, String), Secret>>>;

/// In-memory secret store implementation
#[derive(Clone)]
pub struct MemorySecretStore {
    secrets: SecretStorage,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self {
            secrets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace a secret
    pub fn insert_secret(&self, secret: Secret) -> Result<()> {
        let mut secrets = self
            .secrets
            .write()
            .map_err(|_| KeyError::lock_error("Failed to acquire write lock"))?;

        secrets.insert((secret.namespace.clone(), secret.name.clone()), secret);
        Ok(())
    }

    /// Remove a secret
    pub fn remove_secret(&self, namespace: &str, name: &str) -> Result<()> {
        let mut secrets = self
            .secrets
            .write()
            .map_err(|_| KeyError::lock_error("Failed to acquire write lock"))?;

        secrets
            .remove(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| KeyError::not_found(namespace, name))
            .map(|_| ())
    }

    pub fn len(&self) -> Result<usize> {
        let secrets = self
            .secrets
            .read()
            .map_err(|_| KeyError::lock_error("Failed to acquire read lock"))?;

        Ok(secrets.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for MemorySecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for MemorySecretStore {
    fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret> {
        let secrets = self
            .secrets
            .read()
            .map_err(|_| KeyError::lock_error("Failed to acquire read lock"))?;

        secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| KeyError::not_found(namespace, name))
    }
}
