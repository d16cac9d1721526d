//! Wallet service event loop.
//!
//! [`WalletService::spawn`] moves the handler into a tokio task that owns
//! all wallet state. The task multiplexes two sources with `tokio::select!`:
//!
//! 1. **Requests** from [`ServiceHandle`]s (messages, provider calls, shutdown).
//! 2. **Auto-lock signals** from the inactivity timer.
//!
//! Each request runs to completion before the next is taken, which is what
//! serializes create/unlock/lock/switch against each other.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::WalletConfig;
use crate::session::{AutoLockFired, AutoLockTimer, WalletSession};
use crate::storage::KeyValueStore;
use crate::wallet::WalletFactory;

use super::message_handler::MessageHandler;
use super::provider::ProviderError;
use super::types::{Message, MessageResponse};

const REQUEST_BUFFER: usize = 64;
const CHAIN_EVENT_BUFFER: usize = 16;
const SERVICE_STOPPED: &str = "Wallet service is not running";

enum Request {
    Message {
        message: Message,
        reply: oneshot::Sender<MessageResponse>,
    },
    Json {
        raw: Value,
        reply: oneshot::Sender<MessageResponse>,
    },
    Provider {
        method: String,
        params: Vec<Value>,
        reply: oneshot::Sender<Result<Value, ProviderError>>,
    },
    Shutdown,
}

pub struct WalletService {
    handler: MessageHandler,
    lock_signals: Option<mpsc::UnboundedReceiver<AutoLockFired>>,
    chain_changes: broadcast::Sender<u64>,
}

impl WalletService {
    /// `lock_signals` is the receiving end of the session's inactivity timer.
    pub fn new(
        handler: MessageHandler,
        lock_signals: Option<mpsc::UnboundedReceiver<AutoLockFired>>,
    ) -> Self {
        let (chain_changes, _) = broadcast::channel(CHAIN_EVENT_BUFFER);
        Self {
            handler,
            lock_signals,
            chain_changes,
        }
    }

    /// Wire a session, an [`AutoLockTimer`] and a handler from `config`.
    pub fn from_config(
        config: &WalletConfig,
        durable: Arc<dyn KeyValueStore>,
        transient: Arc<dyn KeyValueStore>,
        factory: Arc<dyn WalletFactory>,
    ) -> Self {
        let (timer, lock_signals) = AutoLockTimer::new(config.auto_lock_duration());
        let session = WalletSession::from_config(config, durable, transient, factory)
            .with_timer(Arc::new(timer));
        Self::new(MessageHandler::new(session), Some(lock_signals))
    }

    /// Start the event loop. Must be called from within a tokio runtime.
    pub fn spawn(self) -> (ServiceHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        let handle = ServiceHandle {
            tx,
            chain_changes: self.chain_changes.clone(),
        };
        let task = tokio::spawn(self.run(rx));
        (handle, task)
    }

    async fn run(self, mut rx: mpsc::Receiver<Request>) {
        let WalletService {
            mut handler,
            mut lock_signals,
            chain_changes,
        } = self;
        info!("wallet service started");

        match handler.session_mut().restore().await {
            Ok(true) => info!(chain_id = handler.current_chain_id(), "resumed unlocked session"),
            Ok(false) => debug!("no session to resume"),
            Err(e) => warn!(error = %e, "session restore failed; starting locked"),
        }

        loop {
            tokio::select! {
                request = rx.recv() => match request {
                    Some(Request::Shutdown) | None => break,
                    Some(request) => handle_request(&mut handler, &chain_changes, request).await,
                },

                Some(signal) = next_lock_signal(&mut lock_signals) => {
                    handle_auto_lock(&mut handler, signal).await;
                }
            }
        }

        info!("wallet service stopped");
    }
}

async fn next_lock_signal(
    rx: &mut Option<mpsc::UnboundedReceiver<AutoLockFired>>,
) -> Option<AutoLockFired> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn handle_request(
    handler: &mut MessageHandler,
    chain_changes: &broadcast::Sender<u64>,
    request: Request,
) {
    match request {
        Request::Message { message, reply } => {
            let switching = matches!(message, Message::SwitchChain { .. });
            let response = handler.handle(message).await;
            if switching && response.success {
                publish_chain(handler, chain_changes);
            }
            let _ = reply.send(response);
        }
        Request::Json { raw, reply } => {
            let switching = raw.get("type").and_then(Value::as_str) == Some("switchChain");
            let response = handler.handle_json(raw).await;
            if switching && response.success {
                publish_chain(handler, chain_changes);
            }
            let _ = reply.send(response);
        }
        Request::Provider {
            method,
            params,
            reply,
        } => {
            let result = handler.handle_provider_request(&method, &params).await;
            if method == "wallet_switchEthereumChain" && result.is_ok() {
                publish_chain(handler, chain_changes);
            }
            let _ = reply.send(result);
        }
        Request::Shutdown => {}
    }

    if let Err(e) = handler.session().touch().await {
        warn!(error = %e, "failed to record activity");
    }
}

fn publish_chain(handler: &MessageHandler, chain_changes: &broadcast::Sender<u64>) {
    let chain_id = handler.current_chain_id();
    // No subscribers is fine.
    let _ = chain_changes.send(chain_id);
    debug!(chain_id, "chainChanged published");
}

async fn handle_auto_lock(handler: &mut MessageHandler, signal: AutoLockFired) {
    let session = handler.session_mut();
    if !session.is_unlocked() {
        return;
    }
    if session.timer().is_some_and(|t| !t.is_current(signal)) {
        debug!(generation = signal.generation, "ignoring stale auto-lock signal");
        return;
    }
    match session.lock().await {
        Ok(()) => info!("wallet auto-locked after inactivity"),
        Err(e) => warn!(error = %e, "auto-lock could not clear session record"),
    }
}

/// Cloneable client for a running [`WalletService`].
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Request>,
    chain_changes: broadcast::Sender<u64>,
}

impl ServiceHandle {
    pub async fn send(&self, message: Message) -> MessageResponse {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Request::Message { message, reply }).await.is_err() {
            return MessageResponse::err(SERVICE_STOPPED);
        }
        rx.await
            .unwrap_or_else(|_| MessageResponse::err(SERVICE_STOPPED))
    }

    /// Send a raw JSON message, parsed inside the service.
    pub async fn send_json(&self, raw: Value) -> MessageResponse {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Request::Json { raw, reply }).await.is_err() {
            return MessageResponse::err(SERVICE_STOPPED);
        }
        rx.await
            .unwrap_or_else(|_| MessageResponse::err(SERVICE_STOPPED))
    }

    pub async fn provider_request(
        &self,
        method: impl Into<String>,
        params: Vec<Value>,
    ) -> Result<Value, ProviderError> {
        let (reply, rx) = oneshot::channel();
        let request = Request::Provider {
            method: method.into(),
            params,
            reply,
        };
        if self.tx.send(request).await.is_err() {
            return Err(ProviderError::Failed(SERVICE_STOPPED.to_string()));
        }
        rx.await
            .unwrap_or_else(|_| Err(ProviderError::Failed(SERVICE_STOPPED.to_string())))
    }

    /// Ask the loop to exit. Await the `JoinHandle` from `spawn` to confirm.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(Request::Shutdown).await;
    }

    /// Chain ids published after every successful chain switch.
    pub fn subscribe_chain_changes(&self) -> broadcast::Receiver<u64> {
        self.chain_changes.subscribe()
    }
}
