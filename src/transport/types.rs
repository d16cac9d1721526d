//! Inbound command messages and their uniform response shape.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every command the dispatcher accepts, tagged by `type` on the wire.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    CreateWallet { password: String },
    UnlockWallet { password: String },
    LockWallet,
    CheckWalletExists,
    GetAddress,
    GetBalance,
    GetChainId,
    SwitchChain {
        #[serde(rename = "chainId")]
        chain_id: u64,
    },
}

impl Message {
    /// Wire names of all message types.
    pub const KINDS: [&'static str; 8] = [
        "createWallet",
        "unlockWallet",
        "lockWallet",
        "checkWalletExists",
        "getAddress",
        "getBalance",
        "getChainId",
        "switchChain",
    ];

    /// The wire `type` of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::CreateWallet { .. } => "createWallet",
            Message::UnlockWallet { .. } => "unlockWallet",
            Message::LockWallet => "lockWallet",
            Message::CheckWalletExists => "checkWalletExists",
            Message::GetAddress => "getAddress",
            Message::GetBalance => "getBalance",
            Message::GetChainId => "getChainId",
            Message::SwitchChain { .. } => "switchChain",
        }
    }
}

// Passwords never reach log output.
impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::CreateWallet { .. } | Message::UnlockWallet { .. } => f
                .debug_struct(self.kind())
                .field("password", &"<redacted>")
                .finish(),
            Message::SwitchChain { chain_id } => f
                .debug_struct(self.kind())
                .field("chain_id", chain_id)
                .finish(),
            _ => f.write_str(self.kind()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageResponse {
    pub fn ok(data: impl Into<Value>) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            error: None,
        }
    }

    pub fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}
