//! Strong type definitions for fileshare.
//!
//! All identifiers are newtypes to prevent misuse at compile time. File and
//! link identifiers are independent random values, so knowing one never
//! reveals the other.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Length in bytes of file and link identifiers.
pub const ID_LEN: usize = 16;

macro_rules! random_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub [u8; ID_LEN]);

        impl $name {
            /// Generate a new random identifier.
            pub fn generate() -> Self {
                let mut bytes = [0u8; ID_LEN];
                rand::thread_rng().fill_bytes(&mut bytes);
                Self(bytes)
            }

            /// Create from raw bytes.
            pub const fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
                Self(bytes)
            }

            /// Get the raw bytes.
            pub const fn as_bytes(&self) -> &[u8; ID_LEN] {
                &self.0
            }

            /// Convert to hex string.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parse from hex string.
            pub fn from_hex(s: &str) -> Result<Self, CoreError> {
                let bytes = hex::decode(s)
                    .map_err(|e| CoreError::InvalidIdentifier(format!("{}: {}", $label, e)))?;
                Self::try_from(bytes.as_slice())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl From<[u8; ID_LEN]> for $name {
            fn from(bytes: [u8; ID_LEN]) -> Self {
                Self(bytes)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = CoreError;

            fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
                let arr: [u8; ID_LEN] = slice.try_into().map_err(|_| {
                    CoreError::InvalidIdentifier(format!(
                        "{}: expected {} bytes, got {}",
                        $label,
                        ID_LEN,
                        slice.len()
                    ))
                })?;
                Ok(Self(arr))
            }
        }
    };
}

random_id!(
    /// Identifier of an uploaded file.
    FileId,
    "file id"
);

random_id!(
    /// Identifier of a shareable link. Acts as the bearer token.
    LinkId,
    "link id"
);

/// Opaque identity of an authenticated user, as issued by the identity provider.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Wrap an identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The party making a request.
///
/// Anonymous principals can only reach a file through a share link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Principal {
    /// An identity vouched for by the identity provider.
    User(UserId),
    /// No identity; only valid together with a link.
    Anonymous,
}

impl Principal {
    /// Shorthand for an authenticated principal.
    pub fn user(id: impl Into<UserId>) -> Self {
        Self::User(id.into())
    }

    /// The user id, if authenticated.
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Principal::User(id) => Some(id),
            Principal::Anonymous => None,
        }
    }

    /// Whether this principal is `user`.
    pub fn is(&self, user: &UserId) -> bool {
        self.user_id() == Some(user)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::User(id) => write!(f, "{}", id),
            Principal::Anonymous => f.write_str("anonymous"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_hex_roundtrip() {
        let id = FileId::from_bytes([0x42; ID_LEN]);
        let recovered = FileId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_link_id_rejects_wrong_length() {
        assert!(LinkId::from_hex("abcd").is_err());
        assert!(LinkId::from_hex("not hex").is_err());
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(FileId::generate(), FileId::generate());
        assert_ne!(LinkId::generate(), LinkId::generate());
    }

    #[test]
    fn test_principal_identity() {
        let alice = UserId::from("alice");
        assert!(Principal::user("alice").is(&alice));
        assert!(!Principal::user("bob").is(&alice));
        assert!(!Principal::Anonymous.is(&alice));
        assert_eq!(Principal::Anonymous.to_string(), "anonymous");
    }
}
