//! Error types for the file share service.

use fileshare_cipher::CipherError;
use fileshare_core::{Action, DenyReason, FileId, ValidationError};
use fileshare_store::StoreError;
use thiserror::Error;

/// Errors that can occur during service operations.
#[derive(Debug, Error)]
pub enum FileShareError {
    /// File does not exist (or is concealed from the caller).
    #[error("file not found: {0}")]
    FileNotFound(FileId),

    /// Link does not exist. The id is a bearer secret and is not echoed.
    #[error("link not found")]
    LinkNotFound,

    /// The authorization engine denied the request.
    #[error("access denied: {0}")]
    Denied(DenyReason),

    /// Owner-only operation attempted by someone else.
    #[error("only the file owner may {0}")]
    NotOwner(&'static str),

    /// Grant or link request failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Upload exceeds the configured limit.
    #[error("payload of {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// The operation does not accept this action.
    #[error("action {0} is not supported here")]
    UnsupportedAction(Action),

    /// File name is empty or too long.
    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    /// Encryption or decryption failed.
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A blocking task was cancelled or panicked.
    #[error("task failed: {0}")]
    Task(String),
}

/// Stable classification of a [`FileShareError`] for callers and transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    NotAuthorized,
    InsufficientPermission,
    NotOwner,
    LinkInactive,
    LinkFileMismatch,
    LinkExpired,
    LinkExhausted,
    InvalidExpiry,
    PermissionExceedsGrant,
    InvalidGrantee,
    InvalidFileName,
    UnsupportedAction,
    PayloadTooLarge,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::NotAuthorized => "NOT_AUTHORIZED",
            ErrorKind::InsufficientPermission => "INSUFFICIENT_PERMISSION",
            ErrorKind::NotOwner => "NOT_OWNER",
            ErrorKind::LinkInactive => "LINK_INACTIVE",
            ErrorKind::LinkFileMismatch => "LINK_FILE_MISMATCH",
            ErrorKind::LinkExpired => "LINK_EXPIRED",
            ErrorKind::LinkExhausted => "LINK_EXHAUSTED",
            ErrorKind::InvalidExpiry => "INVALID_EXPIRY",
            ErrorKind::PermissionExceedsGrant => "PERMISSION_EXCEEDS_GRANT",
            ErrorKind::InvalidGrantee => "INVALID_GRANTEE",
            ErrorKind::InvalidFileName => "INVALID_FILE_NAME",
            ErrorKind::UnsupportedAction => "UNSUPPORTED_ACTION",
            ErrorKind::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    /// HTTP status code for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::NotAuthorized
            | ErrorKind::InsufficientPermission
            | ErrorKind::NotOwner
            | ErrorKind::LinkInactive
            | ErrorKind::LinkFileMismatch
            | ErrorKind::LinkExpired
            | ErrorKind::LinkExhausted => 403,
            ErrorKind::InvalidExpiry
            | ErrorKind::PermissionExceedsGrant
            | ErrorKind::InvalidGrantee
            | ErrorKind::InvalidFileName
            | ErrorKind::UnsupportedAction => 400,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::Internal => 500,
        }
    }
}

impl From<DenyReason> for ErrorKind {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::NotAuthorized => ErrorKind::NotAuthorized,
            DenyReason::InsufficientPermission => ErrorKind::InsufficientPermission,
            DenyReason::LinkInactive => ErrorKind::LinkInactive,
            DenyReason::LinkFileMismatch => ErrorKind::LinkFileMismatch,
            DenyReason::LinkExpired => ErrorKind::LinkExpired,
            DenyReason::LinkExhausted => ErrorKind::LinkExhausted,
        }
    }
}

impl FileShareError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FileShareError::FileNotFound(_) | FileShareError::LinkNotFound => ErrorKind::NotFound,
            FileShareError::Denied(reason) => (*reason).into(),
            FileShareError::NotOwner(_) => ErrorKind::NotOwner,
            FileShareError::Validation(err) => match err {
                ValidationError::ExpiryInPast { .. }
                | ValidationError::ExpiryRequired
                | ValidationError::ExpiryTooFar { .. } => ErrorKind::InvalidExpiry,
                ValidationError::PermissionExceedsGrant { .. } => {
                    ErrorKind::PermissionExceedsGrant
                }
                ValidationError::GranteeIsOwner => ErrorKind::InvalidGrantee,
            },
            FileShareError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            FileShareError::InvalidFileName(_) => ErrorKind::InvalidFileName,
            FileShareError::UnsupportedAction(_) => ErrorKind::UnsupportedAction,
            FileShareError::Cipher(_)
            | FileShareError::Store(_)
            | FileShareError::Config(_)
            | FileShareError::Task(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// The deny reason behind a 403, kept for logs and tests.
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            FileShareError::Denied(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Message safe to show to the caller.
    ///
    /// Every 403 reads the same, and internal failures never leak their cause.
    pub fn public_message(&self) -> String {
        match self.kind().status_code() {
            403 => "access denied".to_string(),
            500 => "internal error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, FileShareError>;
