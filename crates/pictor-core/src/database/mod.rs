//! Image metadata index.
//!
//! The database knows everything about an image except its bytes: owner,
//! dimensions, checksums, dates and user supplied metadata.
pub mod error;
pub mod memory;

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::kernel::constants::DEFAULT_PAGE_LIMIT;
use crate::kernel::error::Result;
use crate::model::Image;

pub use error::DatabaseError;
pub use memory::MemoryDatabase;

/// Paging and filtering of image listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagesQuery {
    /// 1-based page number
    pub page: usize,
    pub limit: usize,
    /// Restrict to these image identifiers, all when empty
    pub ids: Vec<String>,
    /// Include user metadata in the listed images
    pub metadata: bool,
}

impl Default for ImagesQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            ids: Vec::new(),
            metadata: false,
        }
    }
}

/// One page of images plus the total number of matches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImagesPage {
    pub images: Vec<Image>,
    pub hits: usize,
}

pub trait Database: Send + Sync + Debug {
    /// Index an image. Re-inserting an existing image only bumps its update date.
    fn insert_image(&self, user: &str, image_identifier: &str, image: &Image) -> Result<()>;

    fn delete_image(&self, user: &str, image_identifier: &str) -> Result<()>;

    /// Everything known about an image, without its bytes
    fn load_image(&self, user: &str, image_identifier: &str) -> Result<Image>;

    fn get_images(&self, user: &str, query: &ImagesQuery) -> Result<ImagesPage>;

    fn image_exists(&self, user: &str, image_identifier: &str) -> Result<bool>;

    fn get_metadata(&self, user: &str, image_identifier: &str) -> Result<Map<String, Value>>;

    /// Merge `metadata` into the stored metadata
    fn update_metadata(&self, user: &str, image_identifier: &str, metadata: &Map<String, Value>) -> Result<()>;

    fn delete_metadata(&self, user: &str, image_identifier: &str) -> Result<()>;

    /// Latest change for one image, or for the user's whole collection.
    /// `None` when there is nothing to date.
    fn get_last_modified(&self, user: &str, image_identifier: Option<&str>) -> Result<Option<DateTime<Utc>>>;

    /// Image count for one user, or for everybody
    fn get_num_images(&self, user: Option<&str>) -> Result<usize>;

    fn get_num_users(&self) -> Result<usize>;

    /// Total size of the stored originals
    fn get_num_bytes(&self, user: Option<&str>) -> Result<usize>;

    fn get_status(&self) -> bool;
}

#[cfg(test)]
mod tests;
