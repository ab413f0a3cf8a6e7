//! Validation rules for creating grants and links.
//!
//! These are pure checks; the registries in the `fileshare` crate call them
//! before touching the store.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::AccessGrant;
use crate::permission::Permission;
use crate::types::UserId;

/// Limits applied when a link is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkPolicy {
    /// Highest tier an owner may put on a link.
    ///
    /// Owners hold `Edit` on their own files, but links are bearer tokens,
    /// so owner-created links are capped at `Download` unless raised here.
    pub owner_ceiling: Permission,

    /// Reject links created without an expiry.
    pub require_expiry: bool,

    /// Longest allowed link lifetime in milliseconds, measured from creation.
    pub max_ttl_ms: Option<i64>,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self {
            owner_ceiling: Permission::Download,
            require_expiry: false,
            max_ttl_ms: None,
        }
    }
}

impl LinkPolicy {
    /// The highest tier `creator` may place on a new link, or `None` if the
    /// creator holds no authority over the file at all.
    pub fn ceiling_for(
        &self,
        owner: &UserId,
        creator: &UserId,
        creator_grant: Option<&AccessGrant>,
        now: i64,
    ) -> Option<Permission> {
        if owner == creator {
            return Some(self.owner_ceiling);
        }
        creator_grant
            .filter(|g| &g.grantee == creator)
            .and_then(|g| g.live_tier(now))
    }

    /// Validate a requested tier and expiry against `ceiling`.
    pub fn check(
        &self,
        ceiling: Permission,
        requested: Permission,
        expires_at: Option<i64>,
        now: i64,
    ) -> Result<(), ValidationError> {
        if !ceiling.satisfies(requested) {
            return Err(ValidationError::PermissionExceedsGrant { requested, ceiling });
        }

        match expires_at {
            None if self.require_expiry => return Err(ValidationError::ExpiryRequired),
            None => {}
            Some(expires_at) => {
                check_future_expiry(Some(expires_at), now)?;
                if let Some(ttl) = self.max_ttl_ms {
                    let limit = now.saturating_add(ttl);
                    if expires_at > limit {
                        return Err(ValidationError::ExpiryTooFar { expires_at, limit });
                    }
                }
            }
        }

        Ok(())
    }
}

/// Reject an expiry that is not strictly after `now`.
pub fn check_future_expiry(expires_at: Option<i64>, now: i64) -> Result<(), ValidationError> {
    match expires_at {
        Some(expires_at) if expires_at <= now => {
            Err(ValidationError::ExpiryInPast { expires_at, now })
        }
        _ => Ok(()),
    }
}

/// Validate a grant request from the file owner.
pub fn check_grant(
    owner: &UserId,
    grantee: &UserId,
    expires_at: Option<i64>,
    now: i64,
) -> Result<(), ValidationError> {
    if owner == grantee {
        return Err(ValidationError::GranteeIsOwner);
    }
    check_future_expiry(expires_at, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileId;

    const NOW: i64 = 10_000;

    fn grant(user: &str, permission: Permission, expires_at: Option<i64>) -> AccessGrant {
        AccessGrant {
            file_id: FileId::from_bytes([3; 16]),
            grantee: UserId::from(user),
            permission,
            expires_at,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_owner_ceiling_defaults_to_download() {
        let policy = LinkPolicy::default();
        let alice = UserId::from("alice");
        assert_eq!(
            policy.ceiling_for(&alice, &alice, None, NOW),
            Some(Permission::Download)
        );

        let raised = LinkPolicy {
            owner_ceiling: Permission::Edit,
            ..LinkPolicy::default()
        };
        assert_eq!(raised.ceiling_for(&alice, &alice, None, NOW), Some(Permission::Edit));
    }

    #[test]
    fn test_grantee_ceiling_is_their_tier() {
        let policy = LinkPolicy::default();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");

        let g = grant("bob", Permission::Edit, None);
        assert_eq!(policy.ceiling_for(&alice, &bob, Some(&g), NOW), Some(Permission::Edit));

        let expired = grant("bob", Permission::Edit, Some(NOW));
        assert_eq!(policy.ceiling_for(&alice, &bob, Some(&expired), NOW), None);
        assert_eq!(policy.ceiling_for(&alice, &bob, None, NOW), None);
    }

    #[test]
    fn test_check_rejects_escalation() {
        let policy = LinkPolicy::default();
        let err = policy
            .check(Permission::Download, Permission::Edit, None, NOW)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::PermissionExceedsGrant {
                requested: Permission::Edit,
                ceiling: Permission::Download
            }
        );
        assert!(policy.check(Permission::Download, Permission::View, None, NOW).is_ok());
    }

    #[test]
    fn test_check_expiry_rules() {
        let policy = LinkPolicy {
            require_expiry: true,
            max_ttl_ms: Some(1_000),
            ..LinkPolicy::default()
        };
        let p = Permission::View;
        assert_eq!(policy.check(p, p, None, NOW), Err(ValidationError::ExpiryRequired));
        assert!(matches!(
            policy.check(p, p, Some(NOW), NOW),
            Err(ValidationError::ExpiryInPast { .. })
        ));
        assert!(matches!(
            policy.check(p, p, Some(NOW + 1_001), NOW),
            Err(ValidationError::ExpiryTooFar { .. })
        ));
        assert!(policy.check(p, p, Some(NOW + 1_000), NOW).is_ok());
    }

    #[test]
    fn test_check_grant() {
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        assert_eq!(
            check_grant(&alice, &alice, None, NOW),
            Err(ValidationError::GranteeIsOwner)
        );
        assert!(check_grant(&alice, &bob, Some(NOW - 1), NOW).is_err());
        assert!(check_grant(&alice, &bob, Some(NOW + 1), NOW).is_ok());
    }
}
