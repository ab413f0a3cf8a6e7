//! Key material.
//!
//! A [`FileKey`] encrypts one file's content. The [`MasterKey`] never touches
//! content; a wrapping key derived from it encrypts file keys.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use std::fmt;

use crate::error::{CipherError, Result};

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;

const WRAP_CONTEXT: &str = "fileshare-v1 file-key wrapping";

/// Per-file content key. Regenerated whenever content is replaced.
#[derive(Clone)]
pub struct FileKey([u8; KEY_LEN]);

impl FileKey {
    pub fn generate() -> Self {
        Self(random_bytes())
    }

    pub(crate) fn from_slice(bytes: &[u8]) -> Result<Self> {
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| CipherError::DecryptionFailed)
    }

    pub(crate) fn expose(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub(crate) fn aead(&self) -> Aead256 {
        Aead256::new(&self.0)
    }
}

impl fmt::Debug for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FileKey(..)")
    }
}

/// The server-held secret protecting every file key.
#[derive(Clone)]
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    pub fn generate() -> Self {
        Self(random_bytes())
    }

    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a 64-character hex secret, as it would come from the environment.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim()).map_err(|e| CipherError::InvalidKey(e.to_string()))?;
        let len = bytes.len();
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| CipherError::InvalidKey(format!("expected {} bytes, got {}", KEY_LEN, len)))
    }

    /// AEAD keyed with `blake3::derive_key(WRAP_CONTEXT, master)`.
    pub(crate) fn wrapping_aead(&self) -> Aead256 {
        Aead256::new(&blake3::derive_key(WRAP_CONTEXT, &self.0))
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

/// ChaCha20-Poly1305 keyed once, used for any number of seals.
pub(crate) struct Aead256(ChaCha20Poly1305);

impl Aead256 {
    fn new(key: &[u8; KEY_LEN]) -> Self {
        Self(ChaCha20Poly1305::new(Key::from_slice(key)))
    }

    /// Seal under a fresh random nonce.
    pub fn seal(&self, aad: &[u8], plaintext: &[u8]) -> Result<([u8; NONCE_LEN], Vec<u8>)> {
        let nonce: [u8; NONCE_LEN] = random_bytes();
        let sealed = self
            .0
            .encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad })
            .map_err(|e| CipherError::Encryption(e.to_string()))?;
        Ok((nonce, sealed))
    }

    pub fn open(&self, aad: &[u8], nonce: &[u8; NONCE_LEN], sealed: &[u8]) -> Result<Vec<u8>> {
        self.0
            .decrypt(Nonce::from_slice(nonce), Payload { msg: sealed, aad })
            .map_err(|_| CipherError::DecryptionFailed)
    }
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}
