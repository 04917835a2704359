//! Image byte storage.
pub mod error;
pub mod filesystem;

use std::fmt::Debug;

use chrono::{DateTime, Utc};

use crate::kernel::error::Result;

pub use error::StorageSystemError;
pub use filesystem::FilesystemStorage;

/// Backend holding the original bytes of every image.
pub trait Storage: Send + Sync + Debug {
    /// Store `blob`, replacing any previous bytes for the same image
    fn store(&self, user: &str, image_identifier: &str, blob: &[u8]) -> Result<()>;

    fn delete(&self, user: &str, image_identifier: &str) -> Result<()>;

    fn get_image(&self, user: &str, image_identifier: &str) -> Result<Vec<u8>>;

    fn get_last_modified(&self, user: &str, image_identifier: &str) -> Result<DateTime<Utc>>;

    /// Whether the backend is usable
    fn get_status(&self) -> bool;

    fn image_exists(&self, user: &str, image_identifier: &str) -> Result<bool>;
}
