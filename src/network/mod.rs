//! Supported EVM networks.

use serde::{Deserialize, Serialize};

/// Chain id selected when nothing else is configured (Ethereum mainnet).
pub const DEFAULT_CHAIN_ID: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
}

impl Network {
    pub fn new(chain_id: u64, name: impl Into<String>, rpc_url: impl Into<String>) -> Self {
        Self {
            chain_id,
            name: name.into(),
            rpc_url: rpc_url.into(),
        }
    }

    /// `0x`-prefixed lowercase hex chain id, as EIP-1193 providers report it.
    pub fn hex_chain_id(&self) -> String {
        format!("{:#x}", self.chain_id)
    }
}

/// The fixed set of networks a wallet may bind to.
///
/// Order is preserved from construction; `default_network` is the entry for
/// the configured default chain, falling back to the first entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRegistry {
    networks: Vec<Network>,
    default_chain_id: u64,
}

impl NetworkRegistry {
    /// Build a registry. Returns `None` if `networks` is empty or repeats a chain id.
    pub fn new(networks: Vec<Network>, default_chain_id: u64) -> Option<Self> {
        if networks.is_empty() {
            return None;
        }
        for (i, n) in networks.iter().enumerate() {
            if networks[..i].iter().any(|m| m.chain_id == n.chain_id) {
                return None;
            }
        }
        Some(Self {
            networks,
            default_chain_id,
        })
    }

    pub fn get(&self, chain_id: u64) -> Option<&Network> {
        self.networks.iter().find(|n| n.chain_id == chain_id)
    }

    pub fn contains(&self, chain_id: u64) -> bool {
        self.get(chain_id).is_some()
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        self.networks.iter().map(|n| n.chain_id).collect()
    }

    pub fn networks(&self) -> &[Network] {
        &self.networks
    }

    pub fn default_network(&self) -> &Network {
        // `new` guarantees at least one entry.
        self.get(self.default_chain_id)
            .unwrap_or(&self.networks[0])
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self {
            networks: default_networks(),
            default_chain_id: DEFAULT_CHAIN_ID,
        }
    }
}

/// Mainnet, Sepolia, Base and Arbitrum with public RPC endpoints.
pub fn default_networks() -> Vec<Network> {
    vec![
        Network::new(1, "Mainnet", "https://eth.llamarpc.com"),
        Network::new(11155111, "Sepolia", "https://sepolia.drpc.org"),
        Network::new(8453, "Base", "https://base.drpc.org"),
        Network::new(42161, "Arbitrum", "https://arbitrum.drpc.org"),
    ]
}
