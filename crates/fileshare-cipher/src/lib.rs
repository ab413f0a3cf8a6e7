//! # Fileshare Cipher
//!
//! Encryption at rest for uploaded files.
//!
//! ## Encryption Model
//!
//! Content uses a two-layer key model:
//!
//! 1. **File Key**: a random ChaCha20-Poly1305 [`FileKey`] per upload seals
//!    the content into a [`Layer::Content`] envelope
//! 2. **Wrapping Key**: derived from the server [`MasterKey`] with BLAKE3
//!    `derive_key`, it seals each file key into a [`Layer::FileKey`] envelope
//!
//! The stored ciphertext and key material are both CBOR [`Envelope`]s,
//! opaque to the rest of the system. Replacing a file's content generates a new
//! file key.
//!
//! ## Usage
//!
//! ```rust
//! use fileshare_cipher::{ChaChaCipher, CipherProvider, MasterKey};
//!
//! let cipher = ChaChaCipher::new(&MasterKey::generate());
//! let sealed = cipher.encrypt(b"quarterly report").unwrap();
//! let plaintext = cipher.decrypt(&sealed.ciphertext, &sealed.key_material).unwrap();
//! assert_eq!(plaintext, b"quarterly report");
//! ```

pub mod envelope;
pub mod error;
pub mod key;
pub mod provider;

pub use envelope::{Envelope, Layer};
pub use error::{CipherError, Result};
pub use key::{FileKey, MasterKey};
pub use provider::{ChaChaCipher, CipherProvider, Sealed};
