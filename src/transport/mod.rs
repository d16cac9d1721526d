pub mod message_handler;
pub mod provider;
pub mod service;
pub mod types;

pub use message_handler::MessageHandler;
pub use provider::ProviderError;
pub use service::{ServiceHandle, WalletService};
pub use types::{Message, MessageResponse};
