//! Service configuration.

use serde::{Deserialize, Serialize};

use fileshare_core::LinkPolicy;

use crate::error::Result;

/// Default upload limit: 100 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Configuration for [`FileShareService`](crate::FileShareService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Limits on link creation.
    pub links: LinkPolicy,

    /// Report "not found" instead of "not authorized" when a principal with
    /// no relationship to a file asks for it by id.
    pub conceal_existence: bool,

    /// Largest accepted plaintext upload, in bytes.
    pub max_upload_bytes: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            links: LinkPolicy::default(),
            conceal_existence: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServiceConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileshare_core::Permission;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(ServiceConfig::from_json("{}").unwrap(), ServiceConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = ServiceConfig::from_json(
            r#"{"conceal_existence": false, "links": {"owner_ceiling": "EDIT", "max_ttl_ms": 3600000}}"#,
        )
        .unwrap();

        assert!(!config.conceal_existence);
        assert_eq!(config.links.owner_ceiling, Permission::Edit);
        assert_eq!(config.links.max_ttl_ms, Some(3_600_000));
        assert!(!config.links.require_expiry);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(ServiceConfig::from_json("{\"max_upload_bytes\": -1}").is_err());
    }
}
