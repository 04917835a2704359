use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::debug;
use tempfile::NamedTempFile;

use crate::kernel::error::Result;
use crate::storage::Storage;
use crate::storage::error::StorageSystemError;

/// Stores images as plain files below a data directory.
///
/// Paths fan out on the first three characters of the user and of the image
/// identifier: `<root>/a/b/c/abcuser/1/2/3/123identifier`.
#[derive(Clone)]
pub struct FilesystemStorage {
    data_dir: PathBuf,
}

impl FilesystemStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn fan_out(path: &mut PathBuf, name: &str) {
        for c in name.chars().take(3) {
            path.push(c.to_string());
        }
        path.push(name);
    }

    fn image_path(&self, user: &str, image_identifier: &str) -> Result<PathBuf> {
        for part in [user, image_identifier] {
            if part.is_empty() || part.contains(['/', '\\']) || part == "." || part == ".." {
                return Err(StorageSystemError::InvalidPath {
                    path: PathBuf::from(part),
                    reason: "path components must be plain names".to_string(),
                }
                .into());
            }
        }

        let mut path = self.data_dir.clone();
        Self::fan_out(&mut path, user);
        Self::fan_out(&mut path, image_identifier);
        Ok(path)
    }

    fn not_found_or_io(e: std::io::Error, operation: &str, path: PathBuf, user: &str, image_identifier: &str) -> StorageSystemError {
        if e.kind() == ErrorKind::NotFound {
            StorageSystemError::image_not_found(user, image_identifier)
        } else {
            StorageSystemError::io(e, operation, path)
        }
    }
}

impl fmt::Debug for FilesystemStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilesystemStorage")
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl Storage for FilesystemStorage {
    fn store(&self, user: &str, image_identifier: &str, blob: &[u8]) -> Result<()> {
        let full_path = self.image_path(user, image_identifier)?;
        let parent = full_path.parent().map(Path::to_path_buf).ok_or_else(|| StorageSystemError::InvalidPath {
            path: full_path.clone(),
            reason: "no parent directory".to_string(),
        })?;

        fs::create_dir_all(&parent).map_err(|e| StorageSystemError::io(e, "create_dir_all", parent.clone()))?;

        // Write next to the target, then move into place
        let mut temp_file =
            NamedTempFile::new_in(&parent).map_err(|e| StorageSystemError::io(e, "create_temp_file", parent.clone()))?;
        temp_file
            .write_all(blob)
            .map_err(|e| StorageSystemError::io(e, "write_to_temp_file", temp_file.path().to_path_buf()))?;
        temp_file
            .persist(&full_path)
            .map_err(|e| StorageSystemError::io(e.error, "persist_temp_file", full_path.clone()))?;

        debug!("Stored {} bytes at {}", blob.len(), full_path.display());
        Ok(())
    }

    fn delete(&self, user: &str, image_identifier: &str) -> Result<()> {
        let path = self.image_path(user, image_identifier)?;
        fs::remove_file(&path)
            .map_err(|e| Self::not_found_or_io(e, "remove_file", path.clone(), user, image_identifier))?;
        Ok(())
    }

    fn get_image(&self, user: &str, image_identifier: &str) -> Result<Vec<u8>> {
        let path = self.image_path(user, image_identifier)?;
        fs::read(&path)
            .map_err(|e| Self::not_found_or_io(e, "read", path.clone(), user, image_identifier).into())
    }

    fn get_last_modified(&self, user: &str, image_identifier: &str) -> Result<DateTime<Utc>> {
        let path = self.image_path(user, image_identifier)?;
        let modified = fs::metadata(&path)
            .and_then(|metadata| metadata.modified())
            .map_err(|e| Self::not_found_or_io(e, "metadata", path.clone(), user, image_identifier))?;
        Ok(DateTime::<Utc>::from(modified))
    }

    fn get_status(&self) -> bool {
        fs::create_dir_all(&self.data_dir).is_ok()
            && fs::metadata(&self.data_dir).is_ok_and(|metadata| !metadata.permissions().readonly())
    }

    fn image_exists(&self, user: &str, image_identifier: &str) -> Result<bool> {
        Ok(self.image_path(user, image_identifier)?.is_file())
    }
}
