//! In-memory implementation of the Store trait.
//!
//! Same semantics as SQLite, including the cascade on file deletion and the
//! atomic link counter, with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use fileshare_core::{AccessGrant, FileId, FileMetadata, FileRecord, LinkId, ShareLink, UserId};

use crate::error::{Result, StoreError};
use crate::traits::{ContentUpdate, RecordOutcome, Store, UpsertResult};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    files: HashMap<FileId, FileRecord>,

    /// Grants keyed by their natural key.
    grants: HashMap<(FileId, UserId), AccessGrant>,

    links: HashMap<LinkId, ShareLink>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_file(&self, file: &FileRecord) -> Result<()> {
        let mut inner = self.write()?;
        if inner.files.contains_key(&file.id) {
            return Err(StoreError::Duplicate(format!("file {}", file.id)));
        }
        inner.files.insert(file.id, file.clone());
        Ok(())
    }

    async fn get_file(&self, id: &FileId) -> Result<Option<FileRecord>> {
        Ok(self.read()?.files.get(id).cloned())
    }

    async fn update_file_content(&self, id: &FileId, update: &ContentUpdate) -> Result<bool> {
        let mut inner = self.write()?;
        let Some(file) = inner.files.get_mut(id) else {
            return Ok(false);
        };

        file.name = update.name.clone();
        file.mime_type = update.mime_type.clone();
        file.size = update.size;
        file.ciphertext = update.ciphertext.clone();
        file.key_material = update.key_material.clone();
        Ok(true)
    }

    async fn delete_file(&self, id: &FileId) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.files.remove(id).is_none() {
            return Ok(false);
        }
        inner.grants.retain(|(file_id, _), _| file_id != id);
        inner.links.retain(|_, link| &link.file_id != id);
        Ok(true)
    }

    async fn list_files_for(&self, user: &UserId, now: i64) -> Result<Vec<FileMetadata>> {
        let inner = self.read()?;

        let mut files: Vec<FileMetadata> = inner
            .files
            .values()
            .filter(|file| {
                file.is_owned_by(user)
                    || inner
                        .grants
                        .get(&(file.id, user.clone()))
                        .is_some_and(|grant| grant.is_live(now))
            })
            .map(FileRecord::metadata)
            .collect();

        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(a.id.cmp(&b.id)));
        Ok(files)
    }

    async fn upsert_grant(&self, grant: &AccessGrant) -> Result<UpsertResult> {
        let mut inner = self.write()?;
        let key = (grant.file_id, grant.grantee.clone());

        match inner.grants.get_mut(&key) {
            Some(existing) => {
                existing.permission = grant.permission;
                existing.expires_at = grant.expires_at;
                existing.updated_at = grant.updated_at;
                Ok(UpsertResult::Updated)
            }
            None => {
                inner.grants.insert(key, grant.clone());
                Ok(UpsertResult::Inserted)
            }
        }
    }

    async fn get_grant(&self, file_id: &FileId, grantee: &UserId) -> Result<Option<AccessGrant>> {
        Ok(self
            .read()?
            .grants
            .get(&(*file_id, grantee.clone()))
            .cloned())
    }

    async fn delete_grant(&self, file_id: &FileId, grantee: &UserId) -> Result<bool> {
        Ok(self
            .write()?
            .grants
            .remove(&(*file_id, grantee.clone()))
            .is_some())
    }

    async fn list_grants(&self, file_id: &FileId) -> Result<Vec<AccessGrant>> {
        let inner = self.read()?;
        let mut grants: Vec<AccessGrant> = inner
            .grants
            .values()
            .filter(|grant| &grant.file_id == file_id)
            .cloned()
            .collect();
        grants.sort_by(|a, b| a.grantee.as_str().cmp(b.grantee.as_str()));
        Ok(grants)
    }

    async fn insert_link(&self, link: &ShareLink) -> Result<()> {
        let mut inner = self.write()?;
        if inner.links.contains_key(&link.id) {
            return Err(StoreError::Duplicate(format!("link {}", link.id)));
        }
        inner.links.insert(link.id, link.clone());
        Ok(())
    }

    async fn get_link(&self, id: &LinkId) -> Result<Option<ShareLink>> {
        Ok(self.read()?.links.get(id).cloned())
    }

    async fn deactivate_link(&self, id: &LinkId) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.links.get_mut(id) {
            Some(link) => {
                link.active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_link_access(&self, id: &LinkId, now: i64) -> Result<RecordOutcome> {
        // Check and increment under one write guard.
        let mut inner = self.write()?;
        let Some(link) = inner.links.get_mut(id) else {
            return Ok(RecordOutcome::Rejected);
        };

        if !link.active || link.is_expired(now) || link.is_exhausted() {
            return Ok(RecordOutcome::Rejected);
        }
        let Some(access_count) = link.access_count.checked_add(1) else {
            return Ok(RecordOutcome::Rejected);
        };

        link.access_count = access_count;
        Ok(RecordOutcome::Recorded { access_count })
    }

    async fn list_links(&self, file_id: &FileId) -> Result<Vec<ShareLink>> {
        let inner = self.read()?;
        let mut links: Vec<ShareLink> = inner
            .links
            .values()
            .filter(|link| &link.file_id == file_id)
            .cloned()
            .collect();
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(links)
    }
}
