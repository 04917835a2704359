use thiserror::Error;

use crate::kernel::constants::error_codes;

#[derive(Debug, Error)]
pub enum AccessControlError {
    #[error("Missing public key")]
    MissingPublicKey,

    #[error("Permission denied (public key)")]
    PermissionDenied { public_key: String, resource: String },

    #[error("Unknown public key")]
    UnknownPublicKey(String),

    #[error("Public key declared twice in config: {0}")]
    DuplicatePublicKey(String),

    #[error("Group not found")]
    GroupNotFound(String),

    #[error("Access rule not found")]
    AccessRuleNotFound { public_key: String, id: u64 },

    #[error("Invalid access control configuration: {0}")]
    InvalidConfiguration(String),
}

impl AccessControlError {
    pub fn status_code(&self) -> u16 {
        match self {
            AccessControlError::MissingPublicKey | AccessControlError::PermissionDenied { .. } => 400,
            AccessControlError::UnknownPublicKey(_)
            | AccessControlError::GroupNotFound(_)
            | AccessControlError::AccessRuleNotFound { .. } => 404,
            AccessControlError::DuplicatePublicKey(_) | AccessControlError::InvalidConfiguration(_) => 500,
        }
    }

    pub fn error_code(&self) -> u16 {
        match self {
            AccessControlError::MissingPublicKey => error_codes::AUTH_MISSING_PARAM,
            AccessControlError::UnknownPublicKey(_) => error_codes::AUTH_UNKNOWN_PUBLIC_KEY,
            _ => error_codes::ERR_UNSPECIFIED,
        }
    }
}
