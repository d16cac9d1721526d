use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;

/// Key-value store abstraction the vault and session adapters persist through.
///
/// Missing keys are not an error: `get` returns `Ok(None)` and `remove` is a
/// no-op. Errors are reserved for faults in the backing store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
