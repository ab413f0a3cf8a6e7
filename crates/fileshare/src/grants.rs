//! Owner-managed access grants.
//!
//! One grant per `(file, grantee)`. Sharing again overwrites the tier and
//! expiry; expired grants stay stored but confer nothing.

use std::sync::Arc;

use fileshare_core::{check_grant, AccessGrant, FileId, FileRecord, Permission, Principal, UserId};
use fileshare_store::Store;

use crate::error::{FileShareError, Result};

/// Grant rules on top of a [`Store`].
pub struct AccessGrants<S> {
    store: Arc<S>,
}

impl<S> Clone for AccessGrants<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> AccessGrants<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create or overwrite the grant for `grantee` on `file`.
    ///
    /// Only the owner may share, never with themselves, and the expiry must
    /// be in the future.
    pub async fn upsert(
        &self,
        file: &FileRecord,
        requester: &Principal,
        grantee: UserId,
        permission: Permission,
        expires_at: Option<i64>,
        now: i64,
    ) -> Result<AccessGrant> {
        if !requester.is(&file.owner) {
            return Err(FileShareError::NotOwner("share this file"));
        }
        check_grant(&file.owner, &grantee, expires_at, now)?;

        let grant = AccessGrant {
            file_id: file.id,
            grantee,
            permission,
            expires_at,
            created_at: now,
            updated_at: now,
        };
        let outcome = self.store.upsert_grant(&grant).await?;

        tracing::info!(
            file = %file.id,
            grantee = %grant.grantee,
            permission = %permission,
            ?expires_at,
            ?outcome,
            "grant saved"
        );

        // Re-read so the caller sees the original created_at on updates.
        let stored = self.store.get_grant(&file.id, &grant.grantee).await?;
        stored.ok_or(FileShareError::FileNotFound(file.id))
    }

    /// Remove `grantee`'s grant. Removing a grant that does not exist is a no-op.
    pub async fn revoke(
        &self,
        file: &FileRecord,
        requester: &Principal,
        grantee: &UserId,
    ) -> Result<()> {
        if !requester.is(&file.owner) {
            return Err(FileShareError::NotOwner("revoke shares"));
        }

        let removed = self.store.delete_grant(&file.id, grantee).await?;
        tracing::info!(file = %file.id, %grantee, removed, "grant revoked");
        Ok(())
    }

    /// The tier `grantee` currently holds through a live grant.
    pub async fn effective_tier(
        &self,
        file_id: &FileId,
        grantee: &UserId,
        now: i64,
    ) -> Result<Option<Permission>> {
        let grant = self.store.get_grant(file_id, grantee).await?;
        Ok(grant.and_then(|g| g.live_tier(now)))
    }

    /// The stored grant for `principal`, live or not. Anonymous principals have none.
    pub async fn grant_for(
        &self,
        file_id: &FileId,
        principal: &Principal,
    ) -> Result<Option<AccessGrant>> {
        match principal.user_id() {
            Some(user) => Ok(self.store.get_grant(file_id, user).await?),
            None => Ok(None),
        }
    }

    /// Every grant on `file`, expired ones included. Owner only.
    pub async fn list_for_file(
        &self,
        file: &FileRecord,
        requester: &Principal,
    ) -> Result<Vec<AccessGrant>> {
        if !requester.is(&file.owner) {
            return Err(FileShareError::NotOwner("list shares"));
        }
        Ok(self.store.list_grants(&file.id).await?)
    }
}
