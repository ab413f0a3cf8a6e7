//! # Fileshare Store
//!
//! Storage abstraction for fileshare. Provides a trait-based interface for
//! files, access grants and share links with SQLite and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`RecordOutcome`] - Result of the atomic link access counter
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fileshare_store::{SqliteStore, Store};
//! use fileshare_core::UserId;
//!
//! async fn example() {
//!     let store = SqliteStore::open("fileshare.db").unwrap();
//!     let files = store.list_files_for(&UserId::from("alice"), 0).await.unwrap();
//!     println!("{} files", files.len());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Upserted grants**: one grant per `(file, grantee)`; re-sharing
//!   overwrites permission and expiry
//! - **Cascading deletes**: removing a file removes its grants and links
//! - **Atomic link accounting**: the one-time check and the counter
//!   increment happen as a single conditional write

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{ContentUpdate, RecordOutcome, Store, UpsertResult};
