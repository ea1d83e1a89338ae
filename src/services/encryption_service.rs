use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use thiserror::Error;

const NONCE_SIZE: usize = 12; // AES-GCM standard nonce size

#[derive(Error, Debug)]
pub enum EncryptionError {
    #[error("invalid hex key: {0}")]
    InvalidKey(String),
    #[error("encryption key must be 32 bytes (256 bits) long")]
    InvalidKeyLength,
    #[error("invalid hex ciphertext: {0}")]
    InvalidCiphertext(String),
    #[error("ciphertext is too short to contain a nonce")]
    CiphertextTooShort,
    #[error("cipher operation failed")]
    CipherFailure,
    #[error("decrypted data is not valid UTF-8")]
    InvalidUtf8,
}

fn cipher_from_hex_key(key_hex: &str) -> Result<Aes256Gcm, EncryptionError> {
    let key_bytes = hex::decode(key_hex).map_err(|e| EncryptionError::InvalidKey(e.to_string()))?;
    if key_bytes.len() != 32 {
        return Err(EncryptionError::InvalidKeyLength);
    }
    Ok(Aes256Gcm::new(key_bytes.as_slice().into()))
}

/// Encrypts a router credential for storage. Output is hex of nonce followed
/// by ciphertext; each call picks a fresh random nonce.
pub fn encrypt(plain_text: &str, key_hex: &str) -> Result<String, EncryptionError> {
    let cipher = cipher_from_hex_key(key_hex)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plain_text.as_bytes())
        .map_err(|_| EncryptionError::CipherFailure)?;

    let mut result = nonce.to_vec();
    result.extend_from_slice(&ciphertext);
    Ok(hex::encode(result))
}

/// Reverses [`encrypt`]. Fails (rather than returning garbage) when the key
/// is wrong or the stored value was tampered with.
pub fn decrypt(cipher_hex: &str, key_hex: &str) -> Result<String, EncryptionError> {
    let cipher = cipher_from_hex_key(key_hex)?;
    let encrypted_data =
        hex::decode(cipher_hex).map_err(|e| EncryptionError::InvalidCiphertext(e.to_string()))?;
    if encrypted_data.len() < NONCE_SIZE {
        return Err(EncryptionError::CiphertextTooShort);
    }

    let (nonce_bytes, ciphertext) = encrypted_data.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);
    let decrypted_bytes = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| EncryptionError::CipherFailure)?;

    String::from_utf8(decrypted_bytes).map_err(|_| EncryptionError::InvalidUtf8)
}
