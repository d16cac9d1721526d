use thiserror::Error;

/// Errors from the password-based vault encryption engine.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Every decryption failure collapses into this variant. Callers must not
    /// be able to tell a wrong password from a tampered salt, IV or ciphertext.
    #[error("Invalid password or corrupted vault")]
    InvalidPasswordOrCorrupted,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Random number generation failed: {0}")]
    RngFailed(String),

    #[error("Crypto task failed: {0}")]
    Task(String),
}

/// Errors raised by key-value store backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by the external wallet/account collaborator.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Account {0} unavailable")]
    AccountUnavailable(u32),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Wallet handle already disposed")]
    Disposed,
}

/// Errors from the wallet session state machine.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Wallet already exists. Use unlock() instead.")]
    AlreadyExists,

    #[error("No wallet found. Create one first.")]
    NoWalletFound,

    #[error("No wallet to switch network")]
    NotUnlocked,

    #[error("Network {0} not found")]
    UnknownNetwork(u64),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl SessionError {
    /// True for failures caused by user input rather than a fault in storage,
    /// crypto, or the wallet provider.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            SessionError::AlreadyExists
                | SessionError::NoWalletFound
                | SessionError::NotUnlocked
                | SessionError::UnknownNetwork(_)
                | SessionError::Vault(VaultError::InvalidPasswordOrCorrupted)
        )
    }
}

/// Failures reported by the message dispatcher. Each one becomes the
/// `error` string of a failed `MessageResponse`.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("No wallet created")]
    NoWallet,

    #[error("Wallet is locked. Please unlock your wallet to switch networks.")]
    Locked,

    #[error("Unsupported chain ID: {0}")]
    UnsupportedChain(u64),

    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl HandlerError {
    /// True when the caller must act (create, unlock) rather than retry.
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            HandlerError::NoWallet
                | HandlerError::Locked
                | HandlerError::Session(SessionError::NoWalletFound)
                | HandlerError::Session(SessionError::NotUnlocked)
        )
    }

    /// Failures that are part of normal use and not worth a warning.
    pub fn is_expected(&self) -> bool {
        match self {
            HandlerError::UnsupportedChain(_) | HandlerError::UnknownMessageType(_) => true,
            HandlerError::Session(e) => e.is_user_error(),
            other => other.requires_user_action(),
        }
    }
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
