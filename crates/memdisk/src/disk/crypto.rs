//! Passphrase encryption for disk files
//!
//! Encrypted disks are stored as base64 text of
//! `salt[16] || nonce[12] || ciphertext_with_tag` (AES-256-GCM, key derived
//! with PBKDF2-HMAC-SHA256).

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;

/// Errors from disk encryption and decryption
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    Encrypt(String),
    #[error("{0}")]
    Decrypt(String),
}

fn derive_key(passphrase: &str, salt: &[u8]) -> [u8; KEY_SIZE] {
    let mut derived_key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut derived_key);
    derived_key
}

/// Encrypt plaintext with a passphrase, returning base64 text.
pub fn encrypt(plaintext: &str, passphrase: &str) -> Result<String, CryptoError> {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);

    let derived_key = derive_key(passphrase, &salt);
    let key = Key::<Aes256Gcm>::from_slice(&derived_key);
    let cipher = Aes256Gcm::new(key);

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

    let mut combined = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
    combined.extend_from_slice(&salt);
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(combined))
}

/// Decrypt base64 text produced by [`encrypt`].
///
/// A wrong passphrase and corrupted data are indistinguishable here; both
/// fail the GCM tag check.
pub fn decrypt(encoded: &str, passphrase: &str) -> Result<String, CryptoError> {
    let data = BASE64
        .decode(encoded.trim())
        .map_err(|e| CryptoError::Decrypt(format!("ciphertext is not valid base64: {e}")))?;

    if data.len() < SALT_SIZE + NONCE_SIZE + 1 {
        return Err(CryptoError::Decrypt("ciphertext is too short".into()));
    }

    let salt = &data[..SALT_SIZE];
    let nonce_bytes = &data[SALT_SIZE..SALT_SIZE + NONCE_SIZE];
    let ciphertext = &data[SALT_SIZE + NONCE_SIZE..];

    let derived_key = derive_key(passphrase, salt);
    let key = Key::<Aes256Gcm>::from_slice(&derived_key);
    let cipher = Aes256Gcm::new(key);
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::Decrypt("wrong key or corrupted data".into()))?;

    String::from_utf8(plaintext)
        .map_err(|e| CryptoError::Decrypt(format!("decrypted data is not valid UTF-8: {e}")))
}

/// Hex-encoded SHA-256 digest
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
