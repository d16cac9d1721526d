pub mod types;
pub mod vault;

pub use types::{
    CipherAlgorithm, EncryptedVault, EncryptionParams, HashAlgorithm, KdfAlgorithm, KdfParams,
    PBKDF2_ITERATIONS, VAULT_VERSION,
};
pub use vault::VaultCrypto;
