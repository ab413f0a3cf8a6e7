//! Stored records: files, access grants and share links.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::permission::Permission;
use crate::types::{FileId, LinkId, UserId};

/// An uploaded file as persisted: metadata plus opaque ciphertext and key material.
#[derive(Clone)]
pub struct FileRecord {
    /// Unique file identifier.
    pub id: FileId,
    /// The owning user. Never changes after creation.
    pub owner: UserId,
    /// Original file name.
    pub name: String,
    /// Declared or inferred MIME type.
    pub mime_type: String,
    /// Plaintext size in bytes.
    pub size: u64,
    /// Encrypted content, in whatever format the cipher provider produced.
    pub ciphertext: Bytes,
    /// Key material needed to decrypt `ciphertext`.
    pub key_material: Bytes,
    /// Upload time (Unix milliseconds).
    pub uploaded_at: i64,
}

impl FileRecord {
    /// The public description of this file.
    pub fn metadata(&self) -> FileMetadata {
        FileMetadata {
            id: self.id,
            owner: self.owner.clone(),
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            size: self.size,
            uploaded_at: self.uploaded_at,
        }
    }

    /// Whether `user` owns this file.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner == user
    }
}

impl fmt::Debug for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileRecord")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.size)
            .field("ciphertext_len", &self.ciphertext.len())
            .field("uploaded_at", &self.uploaded_at)
            .finish_non_exhaustive()
    }
}

/// File metadata safe to hand to any principal allowed to view the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: FileId,
    pub owner: UserId,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub uploaded_at: i64,
}

/// A durable, owner-issued share of one file with one grantee.
///
/// `(file_id, grantee)` is the natural key: at most one grant exists per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub file_id: FileId,
    pub grantee: UserId,
    pub permission: Permission,
    /// Absolute expiry (Unix milliseconds). `None` never expires.
    pub expires_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl AccessGrant {
    /// Whether the grant still confers access at `now`.
    ///
    /// A grant is dead from the instant `now` reaches `expires_at`.
    pub fn is_live(&self, now: i64) -> bool {
        self.expires_at.map_or(true, |expires| expires > now)
    }

    /// The grant's tier if it is still live.
    pub fn live_tier(&self, now: i64) -> Option<Permission> {
        self.is_live(now).then_some(self.permission)
    }
}

/// A bearer link granting access to one file independent of identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLink {
    pub id: LinkId,
    pub file_id: FileId,
    /// Owner or grantee who created the link.
    pub created_by: UserId,
    pub permission: Permission,
    pub created_at: i64,
    /// Absolute expiry (Unix milliseconds). `None` never expires.
    pub expires_at: Option<i64>,
    pub one_time_use: bool,
    /// Number of successful content deliveries through this link.
    pub access_count: u32,
    /// Cleared on explicit revocation.
    pub active: bool,
}

impl ShareLink {
    /// Build a fresh link: zero accesses, active.
    pub fn new(
        file_id: FileId,
        created_by: UserId,
        permission: Permission,
        expires_at: Option<i64>,
        one_time_use: bool,
        now: i64,
    ) -> Self {
        Self {
            id: LinkId::generate(),
            file_id,
            created_by,
            permission,
            created_at: now,
            expires_at,
            one_time_use,
            access_count: 0,
            active: true,
        }
    }

    /// Whether the link has expired at `now`.
    ///
    /// The link is still usable at exactly `expires_at`.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.map_or(false, |expires| now > expires)
    }

    /// Whether a one-time link has already delivered content.
    pub fn is_exhausted(&self) -> bool {
        self.one_time_use && self.access_count > 0
    }

    /// Lifecycle state at `now`.
    pub fn state(&self, now: i64) -> LinkState {
        if !self.active {
            LinkState::Revoked
        } else if self.is_expired(now) {
            LinkState::Expired
        } else if self.is_exhausted() {
            LinkState::Exhausted
        } else {
            LinkState::Usable
        }
    }
}

/// Reported lifecycle state of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Usable,
    Revoked,
    Expired,
    Exhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(expires_at: Option<i64>) -> AccessGrant {
        AccessGrant {
            file_id: FileId::from_bytes([1; 16]),
            grantee: UserId::from("bob"),
            permission: Permission::View,
            expires_at,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_grant_expiry_is_exclusive() {
        let g = grant(Some(1000));
        assert!(g.is_live(999));
        assert!(!g.is_live(1000));
        assert!(!g.is_live(1001));
        assert!(grant(None).is_live(i64::MAX));
    }

    #[test]
    fn test_link_expiry_is_inclusive() {
        let link = ShareLink::new(
            FileId::from_bytes([1; 16]),
            UserId::from("alice"),
            Permission::View,
            Some(1000),
            false,
            0,
        );
        assert!(!link.is_expired(1000));
        assert!(link.is_expired(1001));
        assert_eq!(link.state(1000), LinkState::Usable);
        assert_eq!(link.state(1001), LinkState::Expired);
    }

    #[test]
    fn test_link_state_precedence() {
        let mut link = ShareLink::new(
            FileId::from_bytes([1; 16]),
            UserId::from("alice"),
            Permission::Download,
            Some(10),
            true,
            0,
        );
        link.access_count = 1;
        assert_eq!(link.state(5), LinkState::Exhausted);
        assert_eq!(link.state(11), LinkState::Expired);
        link.active = false;
        assert_eq!(link.state(5), LinkState::Revoked);
    }

    #[test]
    fn test_file_debug_hides_content() {
        let file = FileRecord {
            id: FileId::from_bytes([2; 16]),
            owner: UserId::from("alice"),
            name: "a.txt".into(),
            mime_type: "text/plain".into(),
            size: 3,
            ciphertext: Bytes::from_static(b"secret-ciphertext"),
            key_material: Bytes::from_static(b"secret-key"),
            uploaded_at: 0,
        };
        let debug = format!("{:?}", file);
        assert!(!debug.contains("secret"));
        assert_eq!(file.metadata().name, "a.txt");
    }
}
