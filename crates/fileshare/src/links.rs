//! Share link registry.
//!
//! Links are bearer tokens. Creation is capped by the creator's own
//! authority, revocation is owner-only, and content access through a link
//! is accounted with the store's atomic counter.

use std::sync::Arc;

use fileshare_core::{
    check_link, Action, DenyReason, FileRecord, LinkId, LinkPolicy, Permission, Principal,
    ShareLink,
};
use fileshare_store::{RecordOutcome, Store};

use crate::error::{FileShareError, Result};

/// Link lifecycle on top of a [`Store`].
pub struct LinkRegistry<S> {
    store: Arc<S>,
    policy: LinkPolicy,
}

impl<S> Clone for LinkRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<S: Store> LinkRegistry<S> {
    pub fn new(store: Arc<S>, policy: LinkPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &LinkPolicy {
        &self.policy
    }

    /// Create a link on `file` for `creator`.
    ///
    /// The owner may issue links up to the policy's owner ceiling; a
    /// grantee up to their live grant tier. Anyone else is refused.
    pub async fn create(
        &self,
        file: &FileRecord,
        creator: &Principal,
        permission: Permission,
        expires_at: Option<i64>,
        one_time_use: bool,
        now: i64,
    ) -> Result<ShareLink> {
        let Some(user) = creator.user_id() else {
            return Err(FileShareError::Denied(DenyReason::NotAuthorized));
        };

        let grant = if file.is_owned_by(user) {
            None
        } else {
            self.store.get_grant(&file.id, user).await?
        };

        let ceiling = self
            .policy
            .ceiling_for(&file.owner, user, grant.as_ref(), now)
            .ok_or(FileShareError::Denied(DenyReason::NotAuthorized))?;
        self.policy.check(ceiling, permission, expires_at, now)?;

        let link = ShareLink::new(
            file.id,
            user.clone(),
            permission,
            expires_at,
            one_time_use,
            now,
        );
        self.store.insert_link(&link).await?;

        tracing::info!(
            file = %file.id,
            creator = %user,
            permission = %permission,
            ?expires_at,
            one_time_use,
            "link created"
        );
        Ok(link)
    }

    /// Deactivate `link`. Owner only; revoking twice is harmless.
    pub async fn revoke(
        &self,
        file: &FileRecord,
        link: &ShareLink,
        requester: &Principal,
    ) -> Result<()> {
        if !requester.is(&file.owner) || link.file_id != file.id {
            return Err(FileShareError::NotOwner("revoke links"));
        }

        self.store.deactivate_link(&link.id).await?;
        tracing::info!(file = %file.id, was_active = link.active, "link revoked");
        Ok(())
    }

    /// Look up a link by id.
    pub async fn resolve(&self, id: &LinkId) -> Result<ShareLink> {
        self.store
            .get_link(id)
            .await?
            .ok_or(FileShareError::LinkNotFound)
    }

    /// Like [`resolve`](Self::resolve) but absent links are `None`.
    pub async fn find(&self, id: &LinkId) -> Result<Option<ShareLink>> {
        Ok(self.store.get_link(id).await?)
    }

    /// Consume one unit of the link's budget.
    ///
    /// A rejection is turned into the reason the link is now unusable,
    /// read back from the store; a link that vanished counts as exhausted.
    pub async fn record_access(&self, id: &LinkId, action: Action, now: i64) -> Result<u32> {
        match self.store.record_link_access(id, now).await? {
            RecordOutcome::Recorded { access_count } => Ok(access_count),
            RecordOutcome::Rejected => {
                let reason = match self.store.get_link(id).await? {
                    Some(link) => check_link(&link, link.file_id, action, now)
                        .err()
                        .unwrap_or(DenyReason::LinkExhausted),
                    None => DenyReason::LinkExhausted,
                };
                Err(FileShareError::Denied(reason))
            }
        }
    }

    /// Every link on `file`. Owner only.
    pub async fn list_for_file(
        &self,
        file: &FileRecord,
        requester: &Principal,
    ) -> Result<Vec<ShareLink>> {
        if !requester.is(&file.owner) {
            return Err(FileShareError::NotOwner("list links"));
        }
        Ok(self.store.list_links(&file.id).await?)
    }
}
