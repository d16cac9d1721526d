//! Wallet configuration.
//!
//! Defaults match a production install. `from_env` overlays a few
//! environment variables; values that fail to parse are logged and ignored.
//! Key-derivation parameters are fixed and not configurable here.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::network::{default_networks, Network, NetworkRegistry, DEFAULT_CHAIN_ID};

pub const DEFAULT_AUTO_LOCK_MINUTES: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WalletConfig {
    pub default_chain_id: u64,
    /// Inactivity window before the session locks itself.
    pub auto_lock_minutes: u64,
    pub networks: Vec<Network>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            default_chain_id: DEFAULT_CHAIN_ID,
            auto_lock_minutes: DEFAULT_AUTO_LOCK_MINUTES,
            networks: default_networks(),
        }
    }
}

impl WalletConfig {
    /// Load configuration from environment variables.
    ///
    /// - `WALLET_DEFAULT_CHAIN_ID`: chain selected at startup (default 1)
    /// - `WALLET_AUTO_LOCK_MINUTES`: inactivity lock window (default 15)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(v) = parse_var(&lookup, "WALLET_DEFAULT_CHAIN_ID") {
            config.default_chain_id = v;
        }
        if let Some(v) = parse_var(&lookup, "WALLET_AUTO_LOCK_MINUTES") {
            config.auto_lock_minutes = v;
        }
        info!(
            default_chain_id = config.default_chain_id,
            auto_lock_minutes = config.auto_lock_minutes,
            "wallet config loaded"
        );
        config
    }

    /// Network registry for this config. An empty or duplicated network
    /// table falls back to the built-in one.
    pub fn registry(&self) -> NetworkRegistry {
        match NetworkRegistry::new(self.networks.clone(), self.default_chain_id) {
            Some(registry) => registry,
            None => {
                warn!("configured network table is empty or has duplicate chain ids; using defaults");
                NetworkRegistry::default()
            }
        }
    }

    pub fn auto_lock_duration(&self) -> Duration {
        Duration::from_secs(self.auto_lock_minutes.saturating_mul(60))
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable config value");
            None
        }
    }
}
