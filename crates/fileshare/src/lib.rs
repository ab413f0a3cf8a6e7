//! # Fileshare
//!
//! Encrypted file sharing with scoped grants and bearer links.
//!
//! ## Overview
//!
//! - **Files** are encrypted at rest with a per-file key and owned by
//!   exactly one user
//! - **Grants** share a file with another user at a permission tier,
//!   optionally until an expiry
//! - **Links** let anyone holding the id reach a file, bounded by expiry,
//!   revocation and an optional one-time budget
//! - **Delivery** returns plaintext with a disposition and a fixed set of
//!   hardening headers
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use fileshare::{FileShareService, ServiceConfig};
//! use fileshare::cipher::{ChaChaCipher, MasterKey};
//! use fileshare::core::{Action, Permission, Principal};
//! use fileshare::store::SqliteStore;
//!
//! async fn example() {
//!     let store = SqliteStore::open("fileshare.db").unwrap();
//!     let cipher = ChaChaCipher::new(&MasterKey::generate());
//!     let service = FileShareService::new(store, cipher, ServiceConfig::default());
//!
//!     let alice = Principal::user("alice");
//!     let file = service
//!         .upload(&alice, "plan.pdf", None, Bytes::from_static(b"%PDF-1.7"))
//!         .await
//!         .unwrap();
//!
//!     service
//!         .share(&file.id, &alice, "bob".into(), Permission::View, None)
//!         .await
//!         .unwrap();
//!
//!     let bob = Principal::user("bob");
//!     let inline = service
//!         .get_file_content(&file.id, &bob, Action::ViewContent, None)
//!         .await
//!         .unwrap();
//!     assert_eq!(inline.body.as_ref(), b"%PDF-1.7");
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `fileshare::core` - Identifiers, permissions, records, authorization
//! - `fileshare::cipher` - Encryption at rest
//! - `fileshare::store` - Storage abstraction, SQLite and in-memory

pub mod clock;
pub mod config;
pub mod error;
pub mod grants;
pub mod handler;
pub mod identity;
pub mod links;
pub mod response;
pub mod service;

pub use fileshare_cipher as cipher;
pub use fileshare_core as core;
pub use fileshare_store as store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ServiceConfig;
pub use error::{ErrorKind, FileShareError, Result};
pub use grants::AccessGrants;
pub use handler::{Endpoint, Handler};
pub use identity::IdentityProvider;
pub use links::LinkRegistry;
pub use response::{ContentResponse, Disposition};
pub use service::{FileShareService, LinkAccess};

pub use fileshare_core::{
    Action, DenyReason, FileId, FileMetadata, LinkId, Permission, Principal, UserId,
};
