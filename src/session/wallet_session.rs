//! The lock/unlock state machine.
//!
//! A `WalletSession` is either locked (no handle, no plaintext) or unlocked
//! (exactly one wallet handle bound to the selected network, plus the
//! mnemonic it was built from). Callers serialize access; the session does
//! no internal locking.

use std::sync::Arc;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::WalletConfig;
use crate::crypto::VaultCrypto;
use crate::error::{Result, SessionError};
use crate::network::{Network, NetworkRegistry};
use crate::storage::{KeyValueStore, SessionStorage, VaultStorage};
use crate::wallet::{generate_mnemonic, WalletFactory, WalletHandle, WalletOptions};

use super::auto_lock::InactivityTimer;

enum State {
    Locked,
    Unlocked {
        wallet: Box<dyn WalletHandle>,
        mnemonic: Zeroizing<String>,
    },
}

pub struct WalletSession {
    vault: VaultStorage,
    session: SessionStorage,
    crypto: VaultCrypto,
    factory: Arc<dyn WalletFactory>,
    networks: NetworkRegistry,
    network: Network,
    timer: Option<Arc<dyn InactivityTimer>>,
    state: State,
}

impl WalletSession {
    /// A locked session over the given stores with production KDF parameters
    /// and the built-in network table.
    pub fn new(
        durable: Arc<dyn KeyValueStore>,
        transient: Arc<dyn KeyValueStore>,
        factory: Arc<dyn WalletFactory>,
    ) -> Self {
        let crypto = VaultCrypto::new();
        let networks = NetworkRegistry::default();
        let network = networks.default_network().clone();
        Self {
            vault: VaultStorage::new(durable),
            session: SessionStorage::new(transient, crypto.clone()),
            crypto,
            factory,
            networks,
            network,
            timer: None,
            state: State::Locked,
        }
    }

    pub fn from_config(
        config: &WalletConfig,
        durable: Arc<dyn KeyValueStore>,
        transient: Arc<dyn KeyValueStore>,
        factory: Arc<dyn WalletFactory>,
    ) -> Self {
        Self::new(durable, transient, factory).with_networks(config.registry())
    }

    pub fn with_crypto(mut self, crypto: VaultCrypto) -> Self {
        self.session = self.session.clone().with_crypto(crypto.clone());
        self.crypto = crypto;
        self
    }

    /// Replace the network table. The selected network resets to its default.
    pub fn with_networks(mut self, networks: NetworkRegistry) -> Self {
        self.network = networks.default_network().clone();
        self.networks = networks;
        self
    }

    pub fn with_timer(mut self, timer: Arc<dyn InactivityTimer>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Create a new wallet under `password` and unlock it.
    ///
    /// Fails with [`SessionError::AlreadyExists`] if anything occupies the
    /// vault key, readable or not.
    pub async fn create(&mut self, password: &str) -> Result<&dyn WalletHandle> {
        if self.vault.exists().await? {
            return Err(SessionError::AlreadyExists);
        }

        let mnemonic = generate_mnemonic()?;
        let vault = self.crypto.encrypt(&mnemonic, password).await?;
        self.vault.save(&vault).await?;
        info!(chain_id = self.network.chain_id, "wallet created");

        self.enter_unlocked(mnemonic).await
    }

    /// Decrypt the stored vault and unlock.
    ///
    /// On a wrong password nothing changes: no handle, no session record, and
    /// an already-unlocked session stays as it was.
    pub async fn unlock(&mut self, password: &str) -> Result<&dyn WalletHandle> {
        let Some(vault) = self.vault.load().await? else {
            debug!("unlock requested with no readable vault");
            return Err(SessionError::NoWalletFound);
        };

        let mnemonic = self.crypto.decrypt(&vault, password).await?;
        info!(chain_id = self.network.chain_id, "wallet unlocked");
        self.enter_unlocked(mnemonic).await
    }

    /// Resume from a live session record without a password.
    ///
    /// Returns `false` when there is nothing to resume. Intended to run once
    /// at process start. With a timer that enforces a window, a record idle
    /// for the whole window is cleared instead of resumed, and a resumed
    /// session only gets the rest of its window.
    pub async fn restore(&mut self) -> Result<bool> {
        if self.is_unlocked() {
            return Ok(true);
        }

        let mut remaining = None;
        if let Some(window) = self.timer.as_ref().and_then(|t| t.timeout()) {
            if let Some(idle) = self.session.idle_for().await? {
                if idle >= window {
                    info!(idle_secs = idle.as_secs(), "session idle past auto-lock window; clearing");
                    self.session.clear().await?;
                    return Ok(false);
                }
                remaining = Some(window - idle);
            }
        }

        let Some(mnemonic) = self.session.load().await? else {
            return Ok(false);
        };

        let options = WalletOptions::new(self.network.rpc_url.clone());
        let wallet = self.factory.connect(&mnemonic, &options).await?;
        self.state = State::Unlocked { wallet, mnemonic };
        match (&self.timer, remaining) {
            (Some(timer), Some(remaining)) => timer.arm_for(remaining),
            _ => self.arm_timer(),
        }
        info!(chain_id = self.network.chain_id, "session restored");
        Ok(true)
    }

    /// Lock the wallet. Safe to call in any state, any number of times.
    ///
    /// In-memory key material is released before the session record is
    /// cleared, so a storage fault still leaves the session locked.
    pub async fn lock(&mut self) -> Result<()> {
        if let State::Unlocked { mut wallet, mnemonic } =
            std::mem::replace(&mut self.state, State::Locked)
        {
            wallet.dispose();
            drop(mnemonic);
            info!("wallet locked");
        }
        if let Some(timer) = &self.timer {
            timer.disarm();
        }
        self.session.clear().await?;
        Ok(())
    }

    /// Rebind the unlocked wallet to another supported network.
    ///
    /// The new handle is built from the held mnemonic before the old one is
    /// disposed; on failure the previous binding stays in place.
    pub async fn update_network(&mut self, chain_id: u64) -> Result<&Network> {
        let State::Unlocked { mnemonic, .. } = &self.state else {
            return Err(SessionError::NotUnlocked);
        };
        let Some(network) = self.networks.get(chain_id).cloned() else {
            return Err(SessionError::UnknownNetwork(chain_id));
        };

        let options = WalletOptions::new(network.rpc_url.clone());
        let new_wallet = self.factory.connect(mnemonic, &options).await?;

        if let State::Unlocked { wallet, .. } = &mut self.state {
            let mut old = std::mem::replace(wallet, new_wallet);
            old.dispose();
        }
        info!(from = self.network.chain_id, to = network.chain_id, "network switched");
        self.network = network;

        if let Err(e) = self.session.update_activity().await {
            warn!(error = %e, "failed to record session activity");
        }
        Ok(&self.network)
    }

    /// Record user activity: re-arm the inactivity timer and stamp the
    /// session record. No-op while locked.
    pub async fn touch(&self) -> Result<()> {
        if !self.is_unlocked() {
            return Ok(());
        }
        self.arm_timer();
        self.session.update_activity().await?;
        Ok(())
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self.state, State::Unlocked { .. })
    }

    /// The live wallet handle, or `None` while locked.
    pub fn get(&self) -> Option<&dyn WalletHandle> {
        match &self.state {
            State::Unlocked { wallet, .. } => Some(wallet.as_ref()),
            State::Locked => None,
        }
    }

    /// Whether a durable vault is present, regardless of lock state.
    pub async fn exists(&self) -> Result<bool> {
        Ok(self.vault.exists().await?)
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn networks(&self) -> &NetworkRegistry {
        &self.networks
    }

    pub fn timer(&self) -> Option<&Arc<dyn InactivityTimer>> {
        self.timer.as_ref()
    }

    // Shared tail of create and unlock: bind a handle, persist the session
    // record under a fresh key, then swap state. Any previous handle is
    // disposed only after the new one is in place.
    async fn enter_unlocked(&mut self, mnemonic: Zeroizing<String>) -> Result<&dyn WalletHandle> {
        let options = WalletOptions::new(self.network.rpc_url.clone());
        let mut wallet = self.factory.connect(&mnemonic, &options).await?;

        if let Err(e) = self.session.save(&mnemonic).await {
            wallet.dispose();
            return Err(e);
        }

        let previous = std::mem::replace(&mut self.state, State::Unlocked { wallet, mnemonic });
        if let State::Unlocked { wallet: mut old, .. } = previous {
            old.dispose();
        }
        self.arm_timer();

        match &self.state {
            State::Unlocked { wallet, .. } => Ok(wallet.as_ref()),
            State::Locked => Err(SessionError::NotUnlocked),
        }
    }

    fn arm_timer(&self) {
        if let Some(timer) = &self.timer {
            timer.arm();
        }
    }
}

impl Drop for WalletSession {
    fn drop(&mut self) {
        if let State::Unlocked { wallet, .. } = &mut self.state {
            wallet.dispose();
        }
    }
}
