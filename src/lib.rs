pub mod balance;
pub mod config;
pub mod crypto;
pub mod error;
pub mod network;
pub mod session;
pub mod storage;
pub mod transport;
pub mod wallet;

pub use balance::{fetch_formatted_balance, format_ether};
pub use config::WalletConfig;
pub use crypto::{EncryptedVault, VaultCrypto};
pub use error::{HandlerError, SessionError, StorageError, VaultError, WalletError};
pub use network::{Network, NetworkRegistry};
pub use session::{AutoLockFired, AutoLockTimer, InactivityTimer, WalletSession};
pub use storage::{KeyValueStore, MemoryStore, SessionStorage, SqliteStore, VaultStorage};
pub use transport::{
    Message, MessageHandler, MessageResponse, ProviderError, ServiceHandle, WalletService,
};
pub use wallet::{generate_mnemonic, Account, WalletFactory, WalletHandle, WalletOptions};
