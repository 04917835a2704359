//! # Pictor Core Kernel Errors
//!
//! Defines the top-level error type of the server.
//!
//! [`Error`] aggregates the typed subsystem errors (event pipeline, storage,
//! database, access control) and carries client-facing HTTP failures. Every
//! variant maps to an HTTP status through [`Error::status_code`], which the
//! application uses when it turns a failed request into an error response.
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::auth::error::AccessControlError;
use crate::database::error::DatabaseError;
use crate::event::error::EventSystemError;
use crate::kernel::constants::error_codes;
use crate::storage::error::StorageSystemError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Event pipeline misuse, always a server error
    #[error("Event system error: {0}")]
    EventSystem(#[from] EventSystemError),

    #[error("Storage system error: {0}")]
    StorageSystem(#[from] StorageSystemError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Access control error: {0}")]
    AccessControl(#[from] AccessControlError),

    /// A failure meant for the client, with its status and application error code
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        error_code: u16,
    },

    /// Programmer error, e.g. a model kind a formatter cannot render
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image codec error during {operation}: {source}")]
    Codec {
        operation: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Attempted to use a poisoned lock: {component}")]
    LockPoisoned { component: String },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl Error {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Error::Http {
            status,
            message: message.into(),
            error_code: error_codes::ERR_UNSPECIFIED,
        }
    }

    pub fn http_with_code(status: u16, message: impl Into<String>, error_code: u16) -> Self {
        Error::Http {
            status,
            message: message.into(),
            error_code,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::http(400, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::http(403, message)
    }

    pub fn not_found() -> Self {
        Self::http(404, "Not Found")
    }

    pub fn method_not_allowed() -> Self {
        Self::http(405, "Method not allowed")
    }

    pub fn not_acceptable() -> Self {
        Self::http(406, "Not acceptable")
    }

    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        Self::http(415, message)
    }

    pub fn codec(source: image::ImageError, operation: impl Into<String>) -> Self {
        Error::Codec {
            source,
            operation: operation.into(),
        }
    }

    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        Error::StorageSystem(StorageSystemError::io(source, operation, path))
    }

    /// HTTP status used when this error becomes a response
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Http { status, .. } => *status,
            Error::StorageSystem(e) => e.status_code(),
            Error::Database(e) => e.status_code(),
            Error::AccessControl(e) => e.status_code(),
            Error::Codec { .. } => 415,
            Error::EventSystem(_)
            | Error::InvalidArgument(_)
            | Error::Config(_)
            | Error::LockPoisoned { .. }
            | Error::Other(_) => 500,
        }
    }

    /// Application specific error code reported next to the status
    pub fn error_code(&self) -> u16 {
        match self {
            Error::Http { error_code, .. } => *error_code,
            Error::StorageSystem(e) => e.error_code(),
            Error::Database(e) => e.error_code(),
            Error::AccessControl(e) => e.error_code(),
            Error::Codec { .. } => error_codes::IMAGE_UNSUPPORTED_MIMETYPE,
            _ => error_codes::ERR_UNSPECIFIED,
        }
    }

    /// Message shown to the client
    pub fn message(&self) -> String {
        match self {
            Error::Http { message, .. } => message.clone(),
            Error::StorageSystem(e) => e.to_string(),
            Error::Database(e) => e.to_string(),
            Error::AccessControl(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}
