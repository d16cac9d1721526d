//! Transient persistence of the unlocked mnemonic.
//!
//! The mnemonic is re-encrypted under a fresh random session key that is
//! stored next to the ciphertext. That gives no secrecy beyond the store
//! itself; what it buys is a single record to erase on lock and no plaintext
//! secret in the stored structure. Every `save` draws a new session key.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::vault::random_bytes;
use crate::crypto::{EncryptedVault, VaultCrypto};
use crate::error::{SessionError, StorageError};

use super::traits::KeyValueStore;

/// Transient-namespace key holding the session record.
pub const SESSION_KEY: &str = "session:wallet-session";

/// Format tag for session records. Mismatches invalidate the record.
pub const SESSION_VERSION: u32 = 1;

const SESSION_KEY_BYTES: usize = 32;

/// Stored session record. Not `Debug`: it carries the session key.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[zeroize(skip)]
    pub encrypted_mnemonic: EncryptedVault,
    pub session_key: String,
    /// Unix milliseconds of the last recorded activity.
    pub last_activity: i64,
    pub version: u32,
}

#[derive(Clone)]
pub struct SessionStorage {
    store: Arc<dyn KeyValueStore>,
    crypto: VaultCrypto,
}

impl SessionStorage {
    pub fn new(store: Arc<dyn KeyValueStore>, crypto: VaultCrypto) -> Self {
        Self { store, crypto }
    }

    /// Same store, different encryption engine.
    pub fn with_crypto(mut self, crypto: VaultCrypto) -> Self {
        self.crypto = crypto;
        self
    }

    /// Persist `mnemonic` under a newly generated session key.
    pub async fn save(&self, mnemonic: &str) -> Result<(), SessionError> {
        let mut raw_key: [u8; SESSION_KEY_BYTES] = random_bytes()?;
        let session_key = Zeroizing::new(STANDARD.encode(raw_key));
        raw_key.zeroize();

        let encrypted_mnemonic = self.crypto.encrypt(mnemonic, &session_key).await?;

        let record = SessionRecord {
            encrypted_mnemonic,
            session_key: session_key.to_string(),
            last_activity: now_millis(),
            version: SESSION_VERSION,
        };
        let value = serde_json::to_value(&record).map_err(StorageError::from)?;
        self.store.set(SESSION_KEY, value).await?;
        debug!("session record written");
        Ok(())
    }

    /// Recover the mnemonic from a live session record.
    ///
    /// A record with the wrong version, a malformed shape, or a ciphertext
    /// that does not decrypt is removed and reported as no session. Only
    /// storage faults are returned as errors.
    pub async fn load(&self) -> Result<Option<Zeroizing<String>>, StorageError> {
        let Some(value) = self.store.get(SESSION_KEY).await? else {
            return Ok(None);
        };

        let version = value.get("version").and_then(Value::as_u64);
        if version != Some(u64::from(SESSION_VERSION)) {
            warn!(found = ?version, expected = SESSION_VERSION, "stale session record; clearing");
            self.clear().await?;
            return Ok(None);
        }

        let record: SessionRecord = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "malformed session record; clearing");
                self.clear().await?;
                return Ok(None);
            }
        };

        match self
            .crypto
            .decrypt(&record.encrypted_mnemonic, &record.session_key)
            .await
        {
            Ok(mnemonic) => Ok(Some(mnemonic)),
            Err(e) => {
                warn!(error = %e, "session record failed to decrypt; clearing");
                self.clear().await?;
                Ok(None)
            }
        }
    }

    /// Stamp the record's `lastActivity` with the current time, if a record exists.
    pub async fn update_activity(&self) -> Result<(), StorageError> {
        let Some(mut value) = self.store.get(SESSION_KEY).await? else {
            return Ok(());
        };
        if let Some(obj) = value.as_object_mut() {
            obj.insert("lastActivity".to_string(), Value::from(now_millis()));
            self.store.set(SESSION_KEY, value).await?;
        }
        Ok(())
    }

    pub async fn last_activity(&self) -> Result<Option<i64>, StorageError> {
        Ok(self
            .store
            .get(SESSION_KEY)
            .await?
            .and_then(|v| v.get("lastActivity").and_then(Value::as_i64)))
    }

    /// Time since the record's last activity stamp, or `None` without a
    /// stamped record. A stamp in the future counts as no idle time.
    pub async fn idle_for(&self) -> Result<Option<Duration>, StorageError> {
        let Some(last) = self.last_activity().await? else {
            return Ok(None);
        };
        let elapsed = u64::try_from(now_millis().saturating_sub(last)).unwrap_or(0);
        Ok(Some(Duration::from_millis(elapsed)))
    }

    pub async fn exists(&self) -> Result<bool, StorageError> {
        Ok(self.store.get(SESSION_KEY).await?.is_some())
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(SESSION_KEY).await
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
