//! Permission tiers and requested actions.
//!
//! Tiers form a total order `View < Download < Edit`. Every authorization
//! check reduces an [`Action`] to the tier it requires and compares with
//! [`Permission::satisfies`]; no other comparison exists.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// An ordered permission tier.
///
/// The declaration order defines the ordering used by `PartialOrd`/`Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Permission {
    /// Read metadata and view content inline.
    View = 1,
    /// Everything in `View`, plus download as an attachment.
    Download = 2,
    /// Everything in `Download`, plus replacing the content.
    Edit = 3,
}

impl Permission {
    /// All tiers in ascending order.
    pub const ALL: [Permission; 3] = [Permission::View, Permission::Download, Permission::Edit];

    /// Whether this tier is at least `required`.
    pub fn satisfies(self, required: Permission) -> bool {
        self >= required
    }

    /// Whether this tier allows `action`.
    pub fn permits(self, action: Action) -> bool {
        self.satisfies(action.required_permission())
    }

    /// Convert to u8 for storage.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from the stored u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::View),
            2 => Some(Self::Download),
            3 => Some(Self::Edit),
            _ => None,
        }
    }

    /// Canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::View => "VIEW",
            Permission::Download => "DOWNLOAD",
            Permission::Edit => "EDIT",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "VIEW" => Ok(Self::View),
            "DOWNLOAD" => Ok(Self::Download),
            "EDIT" => Ok(Self::Edit),
            _ => Err(CoreError::UnknownPermission(s.to_owned())),
        }
    }
}

/// Something a principal wants to do with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Read name, type, size and upload time.
    ViewMetadata,
    /// Receive decrypted content for inline display.
    ViewContent,
    /// Receive decrypted content as an attachment.
    Download,
    /// Replace the file's content or name.
    Edit,
}

impl Action {
    /// All actions.
    pub const ALL: [Action; 4] = [
        Action::ViewMetadata,
        Action::ViewContent,
        Action::Download,
        Action::Edit,
    ];

    /// The minimum tier required to perform this action.
    pub fn required_permission(self) -> Permission {
        match self {
            Action::ViewMetadata | Action::ViewContent => Permission::View,
            Action::Download => Permission::Download,
            Action::Edit => Permission::Edit,
        }
    }

    /// Whether performing this action releases decrypted content.
    ///
    /// Only these actions consume a one-time link.
    pub fn releases_content(self) -> bool {
        matches!(self, Action::ViewContent | Action::Download)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::ViewMetadata => "view_metadata",
            Action::ViewContent => "view_content",
            Action::Download => "download",
            Action::Edit => "edit",
        };
        f.write_str(s)
    }
}

impl FromStr for Action {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view_metadata" | "metadata" => Ok(Self::ViewMetadata),
            "view_content" | "view" => Ok(Self::ViewContent),
            "download" => Ok(Self::Download),
            "edit" => Ok(Self::Edit),
            _ => Err(CoreError::UnknownAction(s.to_owned())),
        }
    }
}
