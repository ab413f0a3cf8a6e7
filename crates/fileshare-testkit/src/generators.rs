//! Proptest generators for property-based testing.

use proptest::prelude::*;

use fileshare_core::{
    AccessGrant, Action, FileId, LinkId, Permission, Principal, ShareLink, UserId,
};

/// Generate a permission tier.
pub fn permission() -> impl Strategy<Value = Permission> {
    prop_oneof![
        Just(Permission::View),
        Just(Permission::Download),
        Just(Permission::Edit),
    ]
}

/// Generate an action.
pub fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::ViewMetadata),
        Just(Action::ViewContent),
        Just(Action::Download),
        Just(Action::Edit),
    ]
}

/// Generate a short lowercase user id.
pub fn user_id() -> impl Strategy<Value = UserId> {
    "[a-z]{1,8}".prop_map(UserId::new)
}

/// Generate an authenticated or anonymous principal.
pub fn principal() -> impl Strategy<Value = Principal> {
    prop_oneof![
        1 => Just(Principal::Anonymous),
        4 => user_id().prop_map(Principal::User),
    ]
}

/// Generate a random FileId.
pub fn file_id() -> impl Strategy<Value = FileId> {
    any::<[u8; 16]>().prop_map(FileId::from_bytes)
}

/// Generate a random LinkId.
pub fn link_id() -> impl Strategy<Value = LinkId> {
    any::<[u8; 16]>().prop_map(LinkId::from_bytes)
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=i64::MAX / 4
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Offsets of an expiry relative to "now": `None`, already past, exactly
/// now, or in the future.
pub fn expiry_offset() -> impl Strategy<Value = Option<i64>> {
    prop_oneof![
        Just(None),
        (-1_000_000i64..0).prop_map(Some),
        Just(Some(0)),
        (1i64..1_000_000).prop_map(Some),
    ]
}

/// Shape of a share link, independent of which file it belongs to.
#[derive(Debug, Clone)]
pub struct LinkParams {
    pub permission: Permission,
    pub expires_offset: Option<i64>,
    pub one_time_use: bool,
    pub access_count: u32,
    pub active: bool,
}

impl LinkParams {
    /// Materialize a link on `file_id` as seen at `now`.
    pub fn build(&self, file_id: FileId, creator: UserId, now: i64) -> ShareLink {
        let mut link = ShareLink::new(
            file_id,
            creator,
            self.permission,
            self.expires_offset.map(|offset| now.saturating_add(offset)),
            self.one_time_use,
            now.saturating_sub(1),
        );
        link.access_count = self.access_count;
        link.active = self.active;
        link
    }
}

/// Generate link parameters.
pub fn link_params() -> impl Strategy<Value = LinkParams> {
    (permission(), expiry_offset(), any::<bool>(), 0u32..4, any::<bool>()).prop_map(
        |(permission, expires_offset, one_time_use, access_count, active)| LinkParams {
            permission,
            expires_offset,
            one_time_use,
            access_count,
            active,
        },
    )
}

/// Generate a grant for `grantee` on `file_id`, with an expiry relative to `now`.
pub fn grant(file_id: FileId, grantee: UserId, now: i64) -> impl Strategy<Value = AccessGrant> {
    (permission(), expiry_offset()).prop_map(move |(permission, offset)| AccessGrant {
        file_id,
        grantee: grantee.clone(),
        permission,
        expires_at: offset.map(|o| now.saturating_add(o)),
        created_at: now,
        updated_at: now,
    })
}
