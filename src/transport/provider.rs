//! EIP-1193 provider requests served by the message handler.

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::HandlerError;

use super::message_handler::{first_address, MessageHandler};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The dapp must wait for the user to create or unlock a wallet.
    #[error("{0}")]
    UserActionRequired(String),

    #[error("{0}")]
    Failed(String),
}

impl From<HandlerError> for ProviderError {
    fn from(e: HandlerError) -> Self {
        if e.requires_user_action() {
            ProviderError::UserActionRequired(e.to_string())
        } else {
            ProviderError::Failed(e.to_string())
        }
    }
}

impl MessageHandler {
    pub async fn handle_provider_request(
        &mut self,
        method: &str,
        params: &[Value],
    ) -> Result<Value, ProviderError> {
        debug!(method, "provider request");
        let result = self.provider_request(method, params).await;
        if let Err(ProviderError::Failed(e)) = &result {
            warn!(method, error = %e, "provider request failed");
        }
        result
    }

    async fn provider_request(&mut self, method: &str, params: &[Value]) -> Result<Value, ProviderError> {
        match method {
            "eth_chainId" => Ok(json!(format!("{:#x}", self.current_chain_id()))),

            "eth_accounts" => match self.session().get() {
                Some(wallet) => Ok(json!([first_address(wallet).await?])),
                None => Ok(json!([])),
            },

            "eth_requestAccounts" => {
                let wallet = self.session().get().ok_or_else(|| {
                    ProviderError::UserActionRequired(
                        "No wallet created. Please create a wallet first.".to_string(),
                    )
                })?;
                Ok(json!([first_address(wallet).await?]))
            }

            "wallet_switchEthereumChain" => {
                let chain_id = switch_chain_param(params)?;
                self.switch_chain(chain_id).await?;
                Ok(Value::Null)
            }

            "eth_sendTransaction" => Err(ProviderError::Failed(
                "Transaction signing not implemented".to_string(),
            )),

            other => Err(ProviderError::Failed(format!("Method {other} not supported"))),
        }
    }
}

/// Extract the hex `chainId` from `[{chainId: "0x.."}]`.
fn switch_chain_param(params: &[Value]) -> Result<u64, ProviderError> {
    let raw = params
        .first()
        .and_then(|p| p.get("chainId"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProviderError::Failed("Missing chainId parameter".to_string()))?;

    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    u64::from_str_radix(digits, 16)
        .map_err(|_| ProviderError::Failed(format!("Invalid chainId parameter: {raw}")))
}
