//! Boundary to the account/signing library.
//!
//! The session never derives keys or talks to RPC endpoints itself. It hands
//! a mnemonic and an endpoint to a [`WalletFactory`] and keeps the returned
//! [`WalletHandle`] until lock, when the handle is disposed explicitly.

use async_trait::async_trait;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::vault::random_bytes;
use crate::error::{VaultError, WalletError};

/// 128 bits of entropy encode to a 12-word phrase.
const MNEMONIC_ENTROPY_BYTES: usize = 16;

/// Connection options for a wallet handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletOptions {
    /// JSON-RPC endpoint the handle talks to.
    pub endpoint: String,
}

impl WalletOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
pub trait Account: Send + Sync {
    async fn get_address(&self) -> Result<String, WalletError>;

    /// Balance in the chain's smallest unit (wei).
    async fn get_balance(&self) -> Result<u128, WalletError>;
}

/// A live wallet bound to one mnemonic and one endpoint.
#[async_trait]
pub trait WalletHandle: Send + Sync {
    async fn get_account(&self, index: u32) -> Result<Box<dyn Account>, WalletError>;

    /// Release key material held by the handle. Called exactly once, before
    /// the handle is dropped. Further calls on a disposed handle should fail
    /// with [`WalletError::Disposed`].
    fn dispose(&mut self);
}

/// Builds wallet handles from a mnemonic.
#[async_trait]
pub trait WalletFactory: Send + Sync {
    async fn connect(
        &self,
        mnemonic: &str,
        options: &WalletOptions,
    ) -> Result<Box<dyn WalletHandle>, WalletError>;
}

/// Generate a fresh 12-word English BIP39 mnemonic.
pub fn generate_mnemonic() -> Result<Zeroizing<String>, VaultError> {
    let mut entropy: [u8; MNEMONIC_ENTROPY_BYTES] = random_bytes()?;
    let mnemonic = bip39::Mnemonic::from_entropy(&entropy);
    entropy.zeroize();
    mnemonic
        .map(|m| Zeroizing::new(m.to_string()))
        .map_err(|e| VaultError::RngFailed(format!("mnemonic encoding: {e}")))
}

/// Check that `phrase` is a well-formed English BIP39 mnemonic.
pub fn validate_mnemonic(phrase: &str) -> Result<(), WalletError> {
    bip39::Mnemonic::parse_normalized(phrase)
        .map(|_| ())
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))
}
