//! Evidence encryption for forensics payloads at rest.
//!
//! AES-256-GCM with the data classification and collection context bound
//! into the additional authenticated data, so a payload cannot be decrypted
//! under a different classification or context than it was written with.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The encryption key is invalid (wrong size or format).
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed (corrupted or tampered ciphertext, or wrong
    /// classification/context).
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
}

/// Data classification attached to encrypted evidence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DataClassification {
    Internal,
    Confidential,
    Restricted,
}

impl DataClassification {
    fn as_str(&self) -> &'static str {
        match self {
            DataClassification::Internal => "internal",
            DataClassification::Confidential => "confidential",
            DataClassification::Restricted => "restricted",
        }
    }
}

/// Trait for encrypting and decrypting evidence payloads.
pub trait EvidenceEncryptor: Send + Sync {
    /// Encrypts plaintext bytes, returning base64 `nonce || ciphertext || tag`.
    fn encrypt(
        &self,
        plaintext: &[u8],
        classification: DataClassification,
        context: &str,
    ) -> Result<String, CryptoError>;

    /// Decrypts a base64 ciphertext produced by [`encrypt`](Self::encrypt)
    /// under the same classification and context.
    fn decrypt(
        &self,
        ciphertext: &str,
        classification: DataClassification,
        context: &str,
    ) -> Result<Vec<u8>, CryptoError>;
}

/// AES-256-GCM evidence encryptor.
///
/// Ciphertext format: `base64(nonce || ciphertext || tag)`
/// - Nonce: 12 bytes (96 bits)
/// - Tag: 16 bytes (128 bits), appended by aes-gcm
pub struct Aes256GcmEncryptor {
    cipher: Aes256Gcm,
}

impl Aes256GcmEncryptor {
    /// Creates a new encryptor with the given 32-byte key.
    pub fn new(key: [u8; 32]) -> Self {
        let cipher = Aes256Gcm::new_from_slice(&key).expect("32-byte key is always valid");
        Self { cipher }
    }

    /// Creates a new encryptor from a base64-encoded key.
    pub fn from_base64_key(key_base64: &str) -> Result<Self, CryptoError> {
        let key_bytes = BASE64
            .decode(key_base64)
            .map_err(|e| CryptoError::InvalidKey(format!("invalid base64: {}", e)))?;
        if key_bytes.len() != 32 {
            return Err(CryptoError::InvalidKey(format!(
                "key must be 32 bytes, got {}",
                key_bytes.len()
            )));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&key_bytes);
        Ok(Self::new(key))
    }

    /// Generates a random key, for local development and tests.
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        rand::thread_rng().fill(&mut key);
        Self::new(key)
    }

    fn aad(classification: DataClassification, context: &str) -> Vec<u8> {
        format!("{}:{}", classification.as_str(), context).into_bytes()
    }
}

impl EvidenceEncryptor for Aes256GcmEncryptor {
    fn encrypt(
        &self,
        plaintext: &[u8],
        classification: DataClassification,
        context: &str,
    ) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; 12];
        rand::thread_rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let aad = Self::aad(classification, context);
        let ciphertext = self
            .cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut combined = Vec::with_capacity(12 + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(&combined))
    }

    fn decrypt(
        &self,
        ciphertext_base64: &str,
        classification: DataClassification,
        context: &str,
    ) -> Result<Vec<u8>, CryptoError> {
        let combined = BASE64
            .decode(ciphertext_base64)
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid base64: {}", e)))?;
        if combined.len() < 12 {
            return Err(CryptoError::DecryptionFailed(
                "ciphertext too short".to_string(),
            ));
        }
        let (nonce_bytes, ciphertext) = combined.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);
        let aad = Self::aad(classification, context);

        self.cipher
            .decrypt(
                nonce,
                Payload {
                    msg: ciphertext,
                    aad: &aad,
                },
            )
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}
