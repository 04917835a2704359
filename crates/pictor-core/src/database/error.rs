use thiserror::Error;

use crate::kernel::constants::error_codes;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Image not found")]
    ImageNotFound { user: String, image_identifier: String },

    #[error("Image already exists")]
    ImageAlreadyExists { user: String, image_identifier: String },

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Database state poisoned: {component}")]
    Poisoned { component: String },
}

impl DatabaseError {
    pub fn image_not_found(user: &str, image_identifier: &str) -> Self {
        DatabaseError::ImageNotFound {
            user: user.to_string(),
            image_identifier: image_identifier.to_string(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            DatabaseError::ImageNotFound { .. } => 404,
            DatabaseError::ImageAlreadyExists { .. } => 400,
            DatabaseError::InvalidMetadata(_) => 400,
            DatabaseError::Poisoned { .. } => 500,
        }
    }

    pub fn error_code(&self) -> u16 {
        match self {
            DatabaseError::ImageAlreadyExists { .. } => error_codes::IMAGE_ALREADY_EXISTS,
            _ => error_codes::ERR_UNSPECIFIED,
        }
    }
}
