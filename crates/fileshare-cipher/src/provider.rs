//! The cipher provider seam.
//!
//! The file service only ever sees [`CipherProvider`]: it hands over
//! plaintext and gets back opaque ciphertext plus opaque key material, and
//! later hands both back to get the plaintext again.

use crate::envelope::{Envelope, Layer};
use crate::error::Result;
use crate::key::{Aead256, FileKey, MasterKey};

/// Output of [`CipherProvider::encrypt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Opaque ciphertext to persist with the file.
    pub ciphertext: Vec<u8>,
    /// Opaque key material to persist with the file.
    pub key_material: Vec<u8>,
}

/// Per-file authenticated encryption.
pub trait CipherProvider: Send + Sync {
    /// Encrypt `plaintext` under a freshly generated per-file key.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Sealed>;

    /// Decrypt content previously produced by [`encrypt`](Self::encrypt).
    ///
    /// Any failure is reported as [`CipherError::DecryptionFailed`](crate::CipherError::DecryptionFailed).
    fn decrypt(&self, ciphertext: &[u8], key_material: &[u8]) -> Result<Vec<u8>>;
}

/// ChaCha20-Poly1305 content encryption with per-file keys wrapped under a
/// master key.
pub struct ChaChaCipher {
    wrapping: Aead256,
}

impl ChaChaCipher {
    /// Create a provider whose per-file keys are protected by `master`.
    pub fn new(master: &MasterKey) -> Self {
        Self {
            wrapping: master.wrapping_aead(),
        }
    }
}

impl CipherProvider for ChaChaCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Sealed> {
        let file_key = FileKey::generate();
        let content = Envelope::seal(Layer::Content, &file_key.aead(), plaintext)?;
        let wrapped = Envelope::seal(Layer::FileKey, &self.wrapping, file_key.expose())?;

        Ok(Sealed {
            ciphertext: content.to_bytes()?,
            key_material: wrapped.to_bytes()?,
        })
    }

    fn decrypt(&self, ciphertext: &[u8], key_material: &[u8]) -> Result<Vec<u8>> {
        let raw_key = Envelope::from_bytes(key_material)?.open(Layer::FileKey, &self.wrapping)?;
        let file_key = FileKey::from_slice(&raw_key)?;
        Envelope::from_bytes(ciphertext)?.open(Layer::Content, &file_key.aead())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CipherError;
    use proptest::prelude::*;

    fn cipher() -> ChaChaCipher {
        ChaChaCipher::new(&MasterKey::from_bytes([0x11; 32]))
    }

    #[test]
    fn test_roundtrip_empty() {
        let c = cipher();
        let sealed = c.encrypt(&[]).unwrap();
        assert_eq!(c.decrypt(&sealed.ciphertext, &sealed.key_material).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_fresh_key_per_file() {
        let c = cipher();
        let a = c.encrypt(b"same bytes").unwrap();
        let b = c.encrypt(b"same bytes").unwrap();
        assert_ne!(a.key_material, b.key_material);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_tampered_ciphertext_fails_opaquely() {
        let c = cipher();
        let sealed = c.encrypt(b"do not touch").unwrap();

        let mut envelope = Envelope::from_bytes(&sealed.ciphertext).unwrap();
        envelope.sealed[0] ^= 0x01;
        let tampered = envelope.to_bytes().unwrap();

        assert!(matches!(
            c.decrypt(&tampered, &sealed.key_material),
            Err(CipherError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_swapped_key_material_fails_opaquely() {
        let c = cipher();
        let a = c.encrypt(b"file a").unwrap();
        let b = c.encrypt(b"file b").unwrap();
        assert!(matches!(
            c.decrypt(&a.ciphertext, &b.key_material),
            Err(CipherError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_halves_swapped_fails_opaquely() {
        let c = cipher();
        let sealed = c.encrypt(b"payload").unwrap();
        assert!(matches!(
            c.decrypt(&sealed.key_material, &sealed.ciphertext),
            Err(CipherError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_other_master_key_cannot_decrypt() {
        let sealed = cipher().encrypt(b"payload").unwrap();
        let other = ChaChaCipher::new(&MasterKey::from_bytes([0x22; 32]));
        assert!(other.decrypt(&sealed.ciphertext, &sealed.key_material).is_err());
    }

    proptest! {
        #[test]
        fn prop_decrypt_inverts_encrypt(plaintext in prop::collection::vec(any::<u8>(), 0..4096)) {
            let c = cipher();
            let sealed = c.encrypt(&plaintext).unwrap();
            prop_assert_eq!(c.decrypt(&sealed.ciphertext, &sealed.key_material).unwrap(), plaintext);
        }
    }
}
