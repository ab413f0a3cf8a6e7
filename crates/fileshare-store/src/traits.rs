//! Store trait: the abstract interface for files, grants and links.
//!
//! This trait keeps the service storage-agnostic. Implementations include
//! SQLite (persistent) and in-memory (for tests and embedding).

use async_trait::async_trait;
use bytes::Bytes;

use fileshare_core::{AccessGrant, FileId, FileMetadata, FileRecord, LinkId, ShareLink, UserId};

use crate::error::Result;

/// Result of upserting a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertResult {
    /// No grant existed for the pair; one was created.
    Inserted,
    /// The existing grant's permission and expiry were overwritten.
    Updated,
}

/// Result of recording an access against a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The counter was advanced; holds the new value.
    Recorded { access_count: u32 },
    /// The link was missing, inactive, expired or already used up.
    Rejected,
}

/// Replacement content for an existing file.
#[derive(Debug, Clone)]
pub struct ContentUpdate {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub ciphertext: Bytes,
    pub key_material: Bytes,
}

/// The Store trait: async interface for file, grant and link persistence.
///
/// All methods are async to support both blocking (SQLite) and async
/// backends. For SQLite, `spawn_blocking` is used internally to avoid
/// blocking the runtime.
///
/// # Design Notes
///
/// - **Natural grant key**: `(file_id, grantee)` identifies a grant;
///   [`upsert_grant`](Store::upsert_grant) never creates a second one.
/// - **Atomic link accounting**: [`record_link_access`](Store::record_link_access)
///   re-checks the link's state and increments in one step.
/// - **Cascade**: deleting a file deletes its grants and links.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // File Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a newly uploaded file. Fails with `Duplicate` if the id exists.
    async fn insert_file(&self, file: &FileRecord) -> Result<()>;

    /// Get a file, ciphertext included.
    async fn get_file(&self, id: &FileId) -> Result<Option<FileRecord>>;

    /// Replace a file's content and name. Returns `false` if the file is gone.
    async fn update_file_content(&self, id: &FileId, update: &ContentUpdate) -> Result<bool>;

    /// Delete a file with its grants and links. Returns `false` if absent.
    async fn delete_file(&self, id: &FileId) -> Result<bool>;

    /// Files owned by `user` or shared with `user` through a grant that is
    /// live at `now`, newest first, without duplicates.
    async fn list_files_for(&self, user: &UserId, now: i64) -> Result<Vec<FileMetadata>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Grant Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert the grant, or overwrite permission, expiry and `updated_at` of
    /// the existing grant for the same `(file_id, grantee)`.
    async fn upsert_grant(&self, grant: &AccessGrant) -> Result<UpsertResult>;

    /// Get the grant for a `(file, grantee)` pair, expired or not.
    async fn get_grant(&self, file_id: &FileId, grantee: &UserId) -> Result<Option<AccessGrant>>;

    /// Delete a grant. Returns `false` if there was none.
    async fn delete_grant(&self, file_id: &FileId, grantee: &UserId) -> Result<bool>;

    /// All grants on a file, expired ones included.
    async fn list_grants(&self, file_id: &FileId) -> Result<Vec<AccessGrant>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Link Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new link. Fails with `Duplicate` if the id exists.
    async fn insert_link(&self, link: &ShareLink) -> Result<()>;

    /// Get a link by id.
    async fn get_link(&self, id: &LinkId) -> Result<Option<ShareLink>>;

    /// Clear the link's active flag. Returns `false` if the link is absent.
    async fn deactivate_link(&self, id: &LinkId) -> Result<bool>;

    /// Atomically increment the access counter if, at `now`, the link is
    /// active, not expired, and not a one-time link that was already used.
    ///
    /// A counter at `u32::MAX` is never incremented; the access is rejected.
    async fn record_link_access(&self, id: &LinkId, now: i64) -> Result<RecordOutcome>;

    /// All links for a file, newest first.
    async fn list_links(&self, file_id: &FileId) -> Result<Vec<ShareLink>>;
}
