//! Command dispatcher and lock gate.
//!
//! Every inbound command goes through [`MessageHandler::handle`], which
//! never fails: errors become `{success: false, error}` responses. The
//! handler owns the session and the active chain id.

use serde_json::{json, Value};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::error::HandlerError;
use crate::session::WalletSession;
use crate::wallet::WalletHandle;

use super::types::{Message, MessageResponse};

pub struct MessageHandler {
    session: WalletSession,
    current_chain_id: u64,
}

impl MessageHandler {
    pub fn new(session: WalletSession) -> Self {
        let current_chain_id = session.network().chain_id;
        Self {
            session,
            current_chain_id,
        }
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut WalletSession {
        &mut self.session
    }

    pub fn current_chain_id(&self) -> u64 {
        self.current_chain_id
    }

    pub async fn handle(&mut self, message: Message) -> MessageResponse {
        let kind = message.kind();
        debug!(?message, "handling message");

        let result = match message {
            Message::CreateWallet { password } => {
                let password = Zeroizing::new(password);
                self.create_wallet(&password).await
            }
            Message::UnlockWallet { password } => {
                let password = Zeroizing::new(password);
                self.unlock_wallet(&password).await
            }
            Message::LockWallet => self.lock_wallet().await,
            Message::CheckWalletExists => self.check_wallet_exists().await,
            Message::GetAddress => self.get_address().await,
            Message::GetBalance => self.get_balance().await,
            Message::GetChainId => Ok(Some(json!(self.current_chain_id))),
            Message::SwitchChain { chain_id } => self.switch_chain(chain_id).await,
        };

        match result {
            Ok(Some(data)) => MessageResponse::ok(data),
            Ok(None) => MessageResponse::ok_empty(),
            Err(e) => {
                if e.is_expected() {
                    debug!(kind, error = %e, "message rejected");
                } else {
                    warn!(kind, error = %e, "message failed");
                }
                MessageResponse::err(e.to_string())
            }
        }
    }

    /// Parse and handle a raw JSON message.
    pub async fn handle_json(&mut self, raw: Value) -> MessageResponse {
        match parse_message(raw) {
            Ok(message) => self.handle(message).await,
            Err(e) => {
                debug!(error = %e, "rejected unparseable message");
                MessageResponse::err(e.to_string())
            }
        }
    }

    async fn create_wallet(&mut self, password: &str) -> Result<Option<Value>, HandlerError> {
        let wallet = self.session.create(password).await?;
        let address = first_address(wallet).await?;
        self.current_chain_id = self.session.network().chain_id;
        Ok(Some(json!(address)))
    }

    async fn unlock_wallet(&mut self, password: &str) -> Result<Option<Value>, HandlerError> {
        let wallet = self.session.unlock(password).await?;
        let address = first_address(wallet).await?;
        self.current_chain_id = self.session.network().chain_id;
        Ok(Some(json!(address)))
    }

    async fn lock_wallet(&mut self) -> Result<Option<Value>, HandlerError> {
        self.session.lock().await?;
        Ok(None)
    }

    async fn check_wallet_exists(&self) -> Result<Option<Value>, HandlerError> {
        Ok(Some(json!(self.session.exists().await?)))
    }

    async fn get_address(&self) -> Result<Option<Value>, HandlerError> {
        let wallet = self.session.get().ok_or(HandlerError::NoWallet)?;
        Ok(Some(json!(first_address(wallet).await?)))
    }

    async fn get_balance(&self) -> Result<Option<Value>, HandlerError> {
        let wallet = self.session.get().ok_or(HandlerError::NoWallet)?;
        let balance = wallet.get_account(0).await?.get_balance().await?;
        Ok(Some(json!(balance.to_string())))
    }

    // Both gate checks run before anything is mutated. The chain id only
    // moves once the session has rebound its handle.
    pub(super) async fn switch_chain(&mut self, chain_id: u64) -> Result<Option<Value>, HandlerError> {
        if !self.session.is_unlocked() {
            return Err(HandlerError::Locked);
        }
        if !self.session.networks().contains(chain_id) {
            return Err(HandlerError::UnsupportedChain(chain_id));
        }

        self.session.update_network(chain_id).await?;
        self.current_chain_id = chain_id;
        info!(chain_id, "active chain switched");
        Ok(Some(json!(chain_id)))
    }
}

pub(crate) async fn first_address(wallet: &dyn WalletHandle) -> Result<String, HandlerError> {
    Ok(wallet.get_account(0).await?.get_address().await?)
}

fn parse_message(raw: Value) -> Result<Message, HandlerError> {
    let kind = match raw.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        Some(other) => other.to_string(),
        None => "undefined".to_string(),
    };
    if !Message::KINDS.iter().any(|k| *k == kind) {
        return Err(HandlerError::UnknownMessageType(kind));
    }
    serde_json::from_value(raw).map_err(|e| HandlerError::InvalidMessage(e.to_string()))
}
