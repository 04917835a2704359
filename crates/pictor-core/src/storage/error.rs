//! # Pictor Storage Errors
//!
//! [`StorageSystemError`] covers failures of the image storage backends:
//! file I/O, missing images and poisoned internal state. Each variant knows
//! the HTTP status it turns into.
use std::path::PathBuf;
use thiserror::Error;

use crate::kernel::constants::error_codes;

#[derive(Debug, Error)]
pub enum StorageSystemError {
    #[error("I/O error during operation '{operation}' on path '{path}': {source}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found")]
    ImageNotFound { user: String, image_identifier: String },

    #[error("Invalid path provided: '{path}': {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

impl StorageSystemError {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        StorageSystemError::Io {
            source,
            operation: operation.into(),
            path,
        }
    }

    pub fn image_not_found(user: &str, image_identifier: &str) -> Self {
        StorageSystemError::ImageNotFound {
            user: user.to_string(),
            image_identifier: image_identifier.to_string(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            StorageSystemError::ImageNotFound { .. } => 404,
            StorageSystemError::InvalidPath { .. } => 400,
            StorageSystemError::Unavailable(_) => 503,
            StorageSystemError::Io { .. } => 500,
        }
    }

    pub fn error_code(&self) -> u16 {
        error_codes::ERR_UNSPECIFIED
    }
}
