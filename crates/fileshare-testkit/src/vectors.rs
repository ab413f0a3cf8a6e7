//! Authorization decision vectors.
//!
//! A table of requests with known outcomes. Any change to precedence or to
//! the link checks shows up here first.

use fileshare_core::{
    authorize, AccessGrant, AccessRequest, Action, Decision, DenyReason, FileId, Permission,
    Principal, ShareLink, UserId,
};

/// Evaluation time for every vector.
pub const NOW: i64 = 1_000_000;

const OWNER: &str = "owner";
const GRANTEE: &str = "grantee";
const STRANGER: &str = "stranger";

/// Who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Owner,
    Grantee,
    Stranger,
    Anonymous,
}

/// The grant held by [`Caller::Grantee`].
#[derive(Debug, Clone, Copy)]
pub struct GrantVector {
    pub permission: Permission,
    /// Expiry relative to [`NOW`].
    pub expires_offset: Option<i64>,
}

/// The link presented with the request.
#[derive(Debug, Clone, Copy)]
pub struct LinkVector {
    pub permission: Permission,
    pub expires_offset: Option<i64>,
    pub one_time_use: bool,
    pub access_count: u32,
    pub active: bool,
    /// The link belongs to a different file.
    pub other_file: bool,
}

impl LinkVector {
    const fn usable(permission: Permission) -> Self {
        Self {
            permission,
            expires_offset: None,
            one_time_use: false,
            access_count: 0,
            active: true,
            other_file: false,
        }
    }
}

/// Expected outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Allow(Permission),
    Deny(DenyReason),
}

#[derive(Debug, Clone)]
pub struct DecisionVector {
    pub name: &'static str,
    pub caller: Caller,
    pub grant: Option<GrantVector>,
    pub link: Option<LinkVector>,
    pub action: Action,
    pub expected: Expected,
    /// Whether an allowed decision must consume link budget.
    pub records_access: bool,
}

/// Get all decision vectors.
pub fn all_vectors() -> Vec<DecisionVector> {
    use Action::*;
    use Caller::*;
    use DenyReason::*;

    let grant = |permission, expires_offset| Some(GrantVector { permission, expires_offset });
    let link = |v: LinkVector| Some(v);

    vec![
        DecisionVector {
            name: "owner may edit",
            caller: Owner,
            grant: None,
            link: None,
            action: Edit,
            expected: Expected::Allow(Permission::Edit),
            records_access: false,
        },
        DecisionVector {
            name: "owner ignores a revoked link",
            caller: Owner,
            grant: None,
            link: link(LinkVector {
                active: false,
                ..LinkVector::usable(Permission::View)
            }),
            action: Download,
            expected: Expected::Allow(Permission::Edit),
            records_access: false,
        },
        DecisionVector {
            name: "stranger without grant or link",
            caller: Stranger,
            grant: None,
            link: None,
            action: ViewMetadata,
            expected: Expected::Deny(NotAuthorized),
            records_access: false,
        },
        DecisionVector {
            name: "anonymous without link",
            caller: Anonymous,
            grant: None,
            link: None,
            action: ViewContent,
            expected: Expected::Deny(NotAuthorized),
            records_access: false,
        },
        DecisionVector {
            name: "download grant allows download",
            caller: Grantee,
            grant: grant(Permission::Download, None),
            link: None,
            action: Download,
            expected: Expected::Allow(Permission::Download),
            records_access: false,
        },
        DecisionVector {
            name: "download grant denies edit",
            caller: Grantee,
            grant: grant(Permission::Download, None),
            link: None,
            action: Edit,
            expected: Expected::Deny(InsufficientPermission),
            records_access: false,
        },
        DecisionVector {
            name: "view grant denies download",
            caller: Grantee,
            grant: grant(Permission::View, Some(1)),
            link: None,
            action: Download,
            expected: Expected::Deny(InsufficientPermission),
            records_access: false,
        },
        DecisionVector {
            name: "grant expiring now is dead",
            caller: Grantee,
            grant: grant(Permission::Edit, Some(0)),
            link: None,
            action: ViewMetadata,
            expected: Expected::Deny(NotAuthorized),
            records_access: false,
        },
        DecisionVector {
            name: "grant takes precedence over a stronger link",
            caller: Grantee,
            grant: grant(Permission::View, None),
            link: link(LinkVector::usable(Permission::Download)),
            action: Download,
            expected: Expected::Deny(InsufficientPermission),
            records_access: false,
        },
        DecisionVector {
            name: "expired grant falls through to link",
            caller: Grantee,
            grant: grant(Permission::Edit, Some(-1)),
            link: link(LinkVector::usable(Permission::Download)),
            action: Download,
            expected: Expected::Allow(Permission::Download),
            records_access: true,
        },
        DecisionVector {
            name: "anonymous link download records access",
            caller: Anonymous,
            grant: None,
            link: link(LinkVector::usable(Permission::Download)),
            action: Download,
            expected: Expected::Allow(Permission::Download),
            records_access: true,
        },
        DecisionVector {
            name: "link metadata does not record access",
            caller: Anonymous,
            grant: None,
            link: link(LinkVector {
                one_time_use: true,
                ..LinkVector::usable(Permission::View)
            }),
            action: ViewMetadata,
            expected: Expected::Allow(Permission::View),
            records_access: false,
        },
        DecisionVector {
            name: "view link denies download",
            caller: Anonymous,
            grant: None,
            link: link(LinkVector::usable(Permission::View)),
            action: Download,
            expected: Expected::Deny(InsufficientPermission),
            records_access: false,
        },
        DecisionVector {
            name: "revoked link",
            caller: Stranger,
            grant: None,
            link: link(LinkVector {
                active: false,
                ..LinkVector::usable(Permission::Download)
            }),
            action: ViewContent,
            expected: Expected::Deny(LinkInactive),
            records_access: false,
        },
        DecisionVector {
            name: "link for another file",
            caller: Anonymous,
            grant: None,
            link: link(LinkVector {
                other_file: true,
                ..LinkVector::usable(Permission::Download)
            }),
            action: ViewContent,
            expected: Expected::Deny(LinkFileMismatch),
            records_access: false,
        },
        DecisionVector {
            name: "link usable at its expiry instant",
            caller: Anonymous,
            grant: None,
            link: link(LinkVector {
                expires_offset: Some(0),
                ..LinkVector::usable(Permission::View)
            }),
            action: ViewContent,
            expected: Expected::Allow(Permission::View),
            records_access: true,
        },
        DecisionVector {
            name: "link past expiry",
            caller: Anonymous,
            grant: None,
            link: link(LinkVector {
                expires_offset: Some(-1),
                ..LinkVector::usable(Permission::View)
            }),
            action: ViewMetadata,
            expected: Expected::Deny(LinkExpired),
            records_access: false,
        },
        DecisionVector {
            name: "expiry checked before exhaustion",
            caller: Anonymous,
            grant: None,
            link: link(LinkVector {
                expires_offset: Some(-1),
                one_time_use: true,
                access_count: 1,
                ..LinkVector::usable(Permission::Download)
            }),
            action: Download,
            expected: Expected::Deny(LinkExpired),
            records_access: false,
        },
        DecisionVector {
            name: "used one-time link",
            caller: Anonymous,
            grant: None,
            link: link(LinkVector {
                one_time_use: true,
                access_count: 1,
                ..LinkVector::usable(Permission::Download)
            }),
            action: Download,
            expected: Expected::Deny(LinkExhausted),
            records_access: false,
        },
        DecisionVector {
            name: "used one-time link denies metadata",
            caller: Anonymous,
            grant: None,
            link: link(LinkVector {
                one_time_use: true,
                access_count: 1,
                ..LinkVector::usable(Permission::Download)
            }),
            action: ViewMetadata,
            expected: Expected::Deny(LinkExhausted),
            records_access: false,
        },
        DecisionVector {
            name: "reusable link keeps working after use",
            caller: Anonymous,
            grant: None,
            link: link(LinkVector {
                access_count: 3,
                ..LinkVector::usable(Permission::View)
            }),
            action: ViewContent,
            expected: Expected::Allow(Permission::View),
            records_access: true,
        },
    ]
}

/// The file every vector is evaluated against.
pub fn vector_file_id() -> FileId {
    FileId::from_bytes([0xf1; 16])
}

/// Run a vector through [`authorize`].
pub fn evaluate(vector: &DecisionVector) -> Decision {
    let file_id = vector_file_id();
    let owner = UserId::from(OWNER);

    let principal = match vector.caller {
        Caller::Owner => Principal::user(OWNER),
        Caller::Grantee => Principal::user(GRANTEE),
        Caller::Stranger => Principal::user(STRANGER),
        Caller::Anonymous => Principal::Anonymous,
    };

    let grant = vector.grant.map(|g| AccessGrant {
        file_id,
        grantee: UserId::from(GRANTEE),
        permission: g.permission,
        expires_at: g.expires_offset.map(|offset| NOW + offset),
        created_at: 0,
        updated_at: 0,
    });

    let link = vector.link.map(|l| {
        let target = if l.other_file {
            FileId::from_bytes([0xf2; 16])
        } else {
            file_id
        };
        let mut link = ShareLink::new(
            target,
            owner.clone(),
            l.permission,
            l.expires_offset.map(|offset| NOW + offset),
            l.one_time_use,
            0,
        );
        link.access_count = l.access_count;
        link.active = l.active;
        link
    });

    authorize(
        &AccessRequest {
            principal: &principal,
            file_id,
            owner: &owner,
            grant: grant.as_ref(),
            link: link.as_ref(),
            action: vector.action,
        },
        NOW,
    )
}
