//! Durable persistence of the single password-encrypted vault record.

use std::sync::Arc;

use tracing::warn;

use crate::crypto::{EncryptedVault, VAULT_VERSION};
use crate::error::StorageError;

use super::traits::KeyValueStore;

/// Durable-namespace key holding the vault.
pub const VAULT_KEY: &str = "local:vault";

#[derive(Clone)]
pub struct VaultStorage {
    store: Arc<dyn KeyValueStore>,
}

impl VaultStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Write the vault, replacing any previous record wholesale.
    pub async fn save(&self, vault: &EncryptedVault) -> Result<(), StorageError> {
        let value = serde_json::to_value(vault)?;
        self.store.set(VAULT_KEY, value).await
    }

    /// Read the vault.
    ///
    /// A record that does not decode, or that carries a different format
    /// version, is reported as absent. It is left in place: the durable vault
    /// is the only copy of the secret and is never deleted implicitly.
    pub async fn load(&self) -> Result<Option<EncryptedVault>, StorageError> {
        let Some(value) = self.store.get(VAULT_KEY).await? else {
            return Ok(None);
        };

        let vault: EncryptedVault = match serde_json::from_value(value) {
            Ok(vault) => vault,
            Err(e) => {
                warn!(error = %e, "stored vault is unreadable; treating as absent");
                return Ok(None);
            }
        };

        if vault.version != VAULT_VERSION {
            warn!(
                found = vault.version,
                expected = VAULT_VERSION,
                "stored vault has unsupported version; treating as absent"
            );
            return Ok(None);
        }

        Ok(Some(vault))
    }

    /// Whether any record occupies the vault key, readable or not.
    pub async fn exists(&self) -> Result<bool, StorageError> {
        Ok(self.store.get(VAULT_KEY).await?.is_some())
    }

    pub async fn remove(&self) -> Result<(), StorageError> {
        self.store.remove(VAULT_KEY).await
    }
}
