//! Password-based AES-256-GCM encryption for the mnemonic vault.
//!
//! Key: PBKDF2-HMAC-SHA256(password UTF-8, salt:16, iterations) -> 32 bytes
//! Record: base64(ciphertext+tag), base64(IV:12), base64(salt:16) plus the
//! recorded KDF and cipher parameters.
//!
//! Salt and IV are drawn fresh for every call, so encrypting the same
//! plaintext twice never yields the same record.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::Hmac;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::types::{
    EncryptedVault, EncryptionParams, KdfParams, AES_GCM_IV_LENGTH, AES_KEY_LENGTH, SALT_LENGTH,
    VAULT_VERSION,
};
use crate::error::VaultError;

/// Fill a fixed-size array from the OS RNG.
pub(crate) fn random_bytes<const N: usize>() -> Result<[u8; N], VaultError> {
    let mut buf = [0u8; N];
    getrandom::getrandom(&mut buf).map_err(|e| VaultError::RngFailed(e.to_string()))?;
    Ok(buf)
}

/// Derive a 256-bit AES key from a password and salt.
fn derive_key(
    password: &str,
    salt: &[u8],
    iterations: u32,
) -> Result<Zeroizing<[u8; AES_KEY_LENGTH]>, VaultError> {
    let mut key = Zeroizing::new([0u8; AES_KEY_LENGTH]);
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, iterations, key.as_mut())
        .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Run a CPU-heavy crypto closure off the async executor.
async fn run_blocking<T, F>(f: F) -> Result<T, VaultError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, VaultError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| VaultError::Task(e.to_string()))?
}

/// Vault encryption engine.
///
/// Cheap to clone; holds only the KDF parameters it derives keys with.
#[derive(Debug, Clone, Default)]
pub struct VaultCrypto {
    kdf: KdfParams,
}

impl VaultCrypto {
    /// Engine with the production parameters (PBKDF2, 600000 iterations, SHA-256).
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with a custom iteration count. Anything below 1 is raised to 1.
    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            kdf: KdfParams {
                iterations: iterations.max(1),
                ..KdfParams::default()
            },
        }
    }

    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    /// Encrypt a UTF-8 string under `password`.
    pub async fn encrypt(&self, plaintext: &str, password: &str) -> Result<EncryptedVault, VaultError> {
        self.encrypt_bytes(plaintext.as_bytes(), password).await
    }

    /// Decrypt a vault back into a UTF-8 string.
    ///
    /// Non-UTF-8 plaintext is reported with the same generic error as any
    /// other failure.
    pub async fn decrypt(
        &self,
        vault: &EncryptedVault,
        password: &str,
    ) -> Result<Zeroizing<String>, VaultError> {
        let bytes = self.decrypt_bytes(vault, password).await?;
        match String::from_utf8(bytes.to_vec()) {
            Ok(s) => Ok(Zeroizing::new(s)),
            Err(e) => {
                let mut bad = e.into_bytes();
                bad.zeroize();
                Err(VaultError::InvalidPasswordOrCorrupted)
            }
        }
    }

    /// Encrypt arbitrary bytes under `password`.
    pub async fn encrypt_bytes(
        &self,
        plaintext: &[u8],
        password: &str,
    ) -> Result<EncryptedVault, VaultError> {
        let engine = self.clone();
        let plaintext = Zeroizing::new(plaintext.to_vec());
        let password = Zeroizing::new(password.to_owned());
        run_blocking(move || engine.seal(&plaintext, &password)).await
    }

    /// Decrypt a vault back into raw bytes.
    pub async fn decrypt_bytes(
        &self,
        vault: &EncryptedVault,
        password: &str,
    ) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        let engine = self.clone();
        let vault = vault.clone();
        let password = Zeroizing::new(password.to_owned());
        run_blocking(move || engine.open(&vault, &password)).await
    }

    /// Synchronous encryption. Blocks for the full key derivation.
    pub fn seal(&self, plaintext: &[u8], password: &str) -> Result<EncryptedVault, VaultError> {
        let salt: [u8; SALT_LENGTH] = random_bytes()?;
        let iv: [u8; AES_GCM_IV_LENGTH] = random_bytes()?;
        let key = derive_key(password, &salt, self.kdf.iterations)?;

        let cipher = Aes256Gcm::new_from_slice(key.as_ref())
            .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext)
            .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

        Ok(EncryptedVault {
            version: VAULT_VERSION,
            ciphertext: STANDARD.encode(ciphertext),
            iv: STANDARD.encode(iv),
            salt: STANDARD.encode(salt),
            kdf: self.kdf.clone(),
            encryption: EncryptionParams::default(),
            created_at: chrono::Utc::now().timestamp_millis(),
        })
    }

    /// Synchronous decryption. Blocks for the full key derivation.
    pub fn open(
        &self,
        vault: &EncryptedVault,
        password: &str,
    ) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        self.try_open(vault, password)
            .ok_or(VaultError::InvalidPasswordOrCorrupted)
    }

    // Every failure path returns None so that nothing about the failing
    // field reaches the caller.
    fn try_open(&self, vault: &EncryptedVault, password: &str) -> Option<Zeroizing<Vec<u8>>> {
        if vault.version != VAULT_VERSION
            || vault.kdf != self.kdf
            || vault.encryption != EncryptionParams::default()
        {
            return None;
        }

        let salt = STANDARD.decode(&vault.salt).ok()?;
        let iv = STANDARD.decode(&vault.iv).ok()?;
        if iv.len() != AES_GCM_IV_LENGTH {
            return None;
        }
        let ciphertext = STANDARD.decode(&vault.ciphertext).ok()?;

        let key = derive_key(password, &salt, self.kdf.iterations).ok()?;
        let cipher = Aes256Gcm::new_from_slice(key.as_ref()).ok()?;
        cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
            .ok()
            .map(Zeroizing::new)
    }
}
