use serde::{Deserialize, Serialize};

/// Format tag written into every vault record.
///
/// Records carrying any other version are treated as absent by storage.
pub const VAULT_VERSION: u32 = 1;

/// PBKDF2 iteration count for password-derived keys (OWASP 2023 guidance for
/// PBKDF2-HMAC-SHA256).
pub const PBKDF2_ITERATIONS: u32 = 600_000;

/// Random salt length in bytes.
pub const SALT_LENGTH: usize = 16;

/// AES-GCM IV length in bytes (96 bits per NIST recommendation).
pub const AES_GCM_IV_LENGTH: usize = 12;

/// AES key length in bytes (256 bits).
pub const AES_KEY_LENGTH: usize = 32;

/// AES key length in bits, as recorded in the vault.
pub const AES_KEY_BITS: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KdfAlgorithm {
    #[serde(rename = "PBKDF2")]
    Pbkdf2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[serde(rename = "SHA-256")]
    Sha256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CipherAlgorithm {
    #[serde(rename = "AES-GCM")]
    AesGcm,
}

/// Key-derivation parameters, recorded alongside every ciphertext so that a
/// later format migration can recognise legacy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub algorithm: KdfAlgorithm,
    pub iterations: u32,
    pub hash: HashAlgorithm,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            algorithm: KdfAlgorithm::Pbkdf2,
            iterations: PBKDF2_ITERATIONS,
            hash: HashAlgorithm::Sha256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionParams {
    pub algorithm: CipherAlgorithm,
    pub key_length: u32,
}

impl Default for EncryptionParams {
    fn default() -> Self {
        Self {
            algorithm: CipherAlgorithm::AesGcm,
            key_length: AES_KEY_BITS,
        }
    }
}

/// Password-encrypted secret as persisted.
///
/// `ciphertext` (including the GCM tag), `iv` and `salt` are each
/// independently base64 encoded. The plaintext never appears here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedVault {
    pub version: u32,
    pub ciphertext: String,
    pub iv: String,
    pub salt: String,
    pub kdf: KdfParams,
    pub encryption: EncryptionParams,
    /// Unix milliseconds. Informational only.
    pub created_at: i64,
}
