//! Error types for fileshare core.

use thiserror::Error;

use crate::permission::Permission;

/// Errors from parsing and constructing core values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("unknown permission: {0}")]
    UnknownPermission(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),
}

/// Validation failures for grant and link creation requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("expiry {expires_at} is not in the future (now {now})")]
    ExpiryInPast { expires_at: i64, now: i64 },

    #[error("an expiry is required")]
    ExpiryRequired,

    #[error("expiry {expires_at} exceeds the maximum lifetime ending at {limit}")]
    ExpiryTooFar { expires_at: i64, limit: i64 },

    #[error("requested permission {requested} exceeds the creator's ceiling {ceiling}")]
    PermissionExceedsGrant {
        requested: Permission,
        ceiling: Permission,
    },

    #[error("a file cannot be shared with its owner")]
    GranteeIsOwner,
}
