//! # Fileshare Core
//!
//! Pure primitives for fileshare: identifiers, permission tiers, stored
//! records and the authorization engine.
//!
//! This crate contains no I/O, no storage and no cryptography. Every
//! decision is a function of its inputs plus a caller-supplied clock value.
//!
//! ## Key Types
//!
//! - [`Permission`] - Ordered tier `View < Download < Edit`
//! - [`Action`] - What a principal wants to do, mapped to a required tier
//! - [`AccessGrant`] - Durable share of a file with one grantee
//! - [`ShareLink`] - Bearer link with expiry, one-time flag and counter
//! - [`authorize`] - The decision function
//!
//! ## Time
//!
//! All timestamps are Unix milliseconds (`i64`).

pub mod authz;
pub mod error;
pub mod model;
pub mod permission;
pub mod rules;
pub mod types;

pub use authz::{authorize, check_link, AccessPath, AccessRequest, Allowed, Decision, DenyReason};
pub use error::{CoreError, ValidationError};
pub use model::{AccessGrant, FileMetadata, FileRecord, LinkState, ShareLink};
pub use permission::{Action, Permission};
pub use rules::{check_future_expiry, check_grant, LinkPolicy};
pub use types::{FileId, LinkId, Principal, UserId, ID_LEN};
