//! Stored envelopes.
//!
//! Both halves of an encrypted file (the content and its wrapped key) are
//! persisted as one [`Envelope`] shape, serialized as CBOR. The layer and
//! version are fed to the AEAD as associated data, so a key envelope can
//! never be opened as content or vice versa.

use serde::{Deserialize, Serialize};

use crate::error::{CipherError, Result};
use crate::key::{Aead256, NONCE_LEN};

const VERSION: u8 = 1;

/// Which half of an encrypted file an envelope holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// File content sealed under the file key.
    Content,
    /// File key sealed under the wrapping key.
    FileKey,
}

impl Layer {
    fn tag(self) -> u8 {
        match self {
            Layer::Content => 0x01,
            Layer::FileKey => 0x02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub version: u8,
    pub layer: Layer,
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with the Poly1305 tag appended.
    pub sealed: Vec<u8>,
}

impl Envelope {
    pub(crate) fn seal(layer: Layer, aead: &Aead256, plaintext: &[u8]) -> Result<Self> {
        let (nonce, sealed) = aead.seal(&associated_data(VERSION, layer), plaintext)?;
        Ok(Self {
            version: VERSION,
            layer,
            nonce,
            sealed,
        })
    }

    /// Open an envelope that must hold `layer`.
    pub(crate) fn open(&self, layer: Layer, aead: &Aead256) -> Result<Vec<u8>> {
        if self.version != VERSION || self.layer != layer {
            return Err(CipherError::DecryptionFailed);
        }
        aead.open(&associated_data(self.version, self.layer), &self.nonce, &self.sealed)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.sealed.len() + 32);
        ciborium::into_writer(self, &mut buf).map_err(|e| CipherError::Encoding(e.to_string()))?;
        Ok(buf)
    }

    /// Malformed bytes fail the same way a bad tag does.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|_| CipherError::DecryptionFailed)
    }
}

fn associated_data(version: u8, layer: Layer) -> [u8; 2] {
    [version, layer.tag()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::FileKey;

    #[test]
    fn test_layer_mismatch_rejected() {
        let aead = FileKey::generate().aead();
        let envelope = Envelope::seal(Layer::FileKey, &aead, b"32 bytes of key").unwrap();

        assert!(matches!(
            envelope.open(Layer::Content, &aead),
            Err(CipherError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_relabelled_layer_fails_authentication() {
        let aead = FileKey::generate().aead();
        let mut envelope = Envelope::seal(Layer::FileKey, &aead, b"key").unwrap();
        envelope.layer = Layer::Content;

        assert!(envelope.open(Layer::Content, &aead).is_err());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let aead = FileKey::generate().aead();
        let mut envelope = Envelope::seal(Layer::Content, &aead, b"body").unwrap();
        envelope.version = 2;

        assert!(envelope.open(Layer::Content, &aead).is_err());
    }

    #[test]
    fn test_cbor_bytes_reopen() {
        let aead = FileKey::generate().aead();
        let bytes = Envelope::seal(Layer::Content, &aead, b"body")
            .unwrap()
            .to_bytes()
            .unwrap();

        let reopened = Envelope::from_bytes(&bytes).unwrap();
        assert_eq!(reopened.open(Layer::Content, &aead).unwrap(), b"body");
    }

    #[test]
    fn test_garbage_is_opaque_failure() {
        assert!(matches!(
            Envelope::from_bytes(b"\xff\x00garbage"),
            Err(CipherError::DecryptionFailed)
        ));
    }
}
