//! Cipher errors.

use thiserror::Error;

/// Errors that can occur while sealing or opening file content.
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed. Carries no detail about the cause.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Invalid key material supplied at construction time.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("envelope encoding failed: {0}")]
    Encoding(String),
}

/// Result type for cipher operations.
pub type Result<T> = std::result::Result<T, CipherError>;
