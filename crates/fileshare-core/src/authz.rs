//! The authorization engine.
//!
//! A pure function over ownership, the caller's grant, an optional share
//! link, the requested action and the current time. Rules are evaluated in
//! a fixed precedence and the first matching rule decides:
//!
//! 1. the file owner is allowed everything (tier `Edit`), whatever link is
//!    presented;
//! 2. an authenticated principal with a live grant is allowed exactly what
//!    the grant's tier permits, and is otherwise denied;
//! 3. a presented link allows what its tier permits, provided it is active,
//!    points at this file, is not expired and is not an exhausted one-time
//!    link;
//! 4. everything else is denied.
//!
//! An allow through a link for a content-releasing action carries an
//! instruction to record the access. The caller must perform that record as
//! an atomic conditional update before releasing content.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{AccessGrant, ShareLink};
use crate::permission::{Action, Permission};
use crate::types::{FileId, LinkId, Principal, UserId};

/// Everything the engine looks at for one decision.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    pub principal: &'a Principal,
    pub file_id: FileId,
    pub owner: &'a UserId,
    /// The principal's grant on this file, if the store has one.
    pub grant: Option<&'a AccessGrant>,
    /// The link presented with the request, if any.
    pub link: Option<&'a ShareLink>,
    pub action: Action,
}

/// How access was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPath {
    Owner,
    Grant,
    Link(LinkId),
}

/// Details of a positive decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allowed {
    /// The effective tier of the principal on this file.
    pub tier: Permission,
    pub path: AccessPath,
    /// Set when the access must be recorded against a link before content
    /// is released.
    pub record_link_access: Option<LinkId>,
}

/// Why a request was denied.
///
/// The reason is for logs and callers that need to branch on it; it must
/// not be echoed to the requesting party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    /// No ownership, live grant or link applies.
    NotAuthorized,
    /// A grant or link applies but its tier is too low for the action.
    InsufficientPermission,
    /// The link was revoked.
    LinkInactive,
    /// The link belongs to a different file.
    LinkFileMismatch,
    /// The link's expiry has passed.
    LinkExpired,
    /// The one-time link has already been used.
    LinkExhausted,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::NotAuthorized => "NOT_AUTHORIZED",
            DenyReason::InsufficientPermission => "INSUFFICIENT_PERMISSION",
            DenyReason::LinkInactive => "LINK_INACTIVE",
            DenyReason::LinkFileMismatch => "LINK_FILE_MISMATCH",
            DenyReason::LinkExpired => "LINK_EXPIRED",
            DenyReason::LinkExhausted => "LINK_EXHAUSTED",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of [`authorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow(Allowed),
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    /// Effective tier, present only on allow.
    pub fn tier(&self) -> Option<Permission> {
        match self {
            Decision::Allow(allowed) => Some(allowed.tier),
            Decision::Deny(_) => None,
        }
    }

    /// Deny reason, present only on deny.
    pub fn reason(&self) -> Option<DenyReason> {
        match self {
            Decision::Allow(_) => None,
            Decision::Deny(reason) => Some(*reason),
        }
    }

    /// Link whose access counter must be advanced before releasing content.
    pub fn record_link_access(&self) -> Option<LinkId> {
        match self {
            Decision::Allow(allowed) => allowed.record_link_access,
            Decision::Deny(_) => None,
        }
    }

    /// Convert into a `Result` for `?`-style callers.
    pub fn into_result(self) -> Result<Allowed, DenyReason> {
        match self {
            Decision::Allow(allowed) => Ok(allowed),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

/// Decide whether `request` is allowed at time `now` (Unix milliseconds).
pub fn authorize(request: &AccessRequest<'_>, now: i64) -> Decision {
    let required = request.action.required_permission();

    if request.principal.is(request.owner) {
        return Decision::Allow(Allowed {
            tier: Permission::Edit,
            path: AccessPath::Owner,
            record_link_access: None,
        });
    }

    if let Some(tier) = live_grant_tier(request, now) {
        return if tier.satisfies(required) {
            Decision::Allow(Allowed {
                tier,
                path: AccessPath::Grant,
                record_link_access: None,
            })
        } else {
            Decision::Deny(DenyReason::InsufficientPermission)
        };
    }

    if let Some(link) = request.link {
        return match check_link(link, request.file_id, request.action, now) {
            Ok(()) => Decision::Allow(Allowed {
                tier: link.permission,
                path: AccessPath::Link(link.id),
                record_link_access: request.action.releases_content().then_some(link.id),
            }),
            Err(reason) => Decision::Deny(reason),
        };
    }

    Decision::Deny(DenyReason::NotAuthorized)
}

/// Check a link on its own: lifecycle first, then tier.
pub fn check_link(
    link: &ShareLink,
    file_id: FileId,
    action: Action,
    now: i64,
) -> Result<(), DenyReason> {
    if !link.active {
        return Err(DenyReason::LinkInactive);
    }
    if link.file_id != file_id {
        return Err(DenyReason::LinkFileMismatch);
    }
    if link.is_expired(now) {
        return Err(DenyReason::LinkExpired);
    }
    if link.is_exhausted() {
        return Err(DenyReason::LinkExhausted);
    }
    if !link.permission.permits(action) {
        return Err(DenyReason::InsufficientPermission);
    }
    Ok(())
}

/// The grant's tier, if the grant belongs to this principal and file and is live.
fn live_grant_tier(request: &AccessRequest<'_>, now: i64) -> Option<Permission> {
    let user = request.principal.user_id()?;
    let grant = request.grant?;
    if &grant.grantee != user || grant.file_id != request.file_id {
        return None;
    }
    grant.live_tier(now)
}
