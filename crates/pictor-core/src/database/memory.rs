use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::trace;
use serde_json::{Map, Value};

use crate::database::error::DatabaseError;
use crate::database::{Database, ImagesPage, ImagesQuery};
use crate::kernel::error::Result;
use crate::model::Image;

/// Process-local database. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    // user -> images in insertion order
    images: Arc<Mutex<BTreeMap<String, Vec<Image>>>>,
}

impl fmt::Debug for MemoryDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let users = self.images.lock().map(|images| images.len()).unwrap_or_default();
        f.debug_struct("MemoryDatabase").field("users", &users).finish()
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<Image>>>> {
        self.images.lock().map_err(|_| {
            DatabaseError::Poisoned {
                component: "memory_database".to_string(),
            }
            .into()
        })
    }

    fn with_image<T>(&self, user: &str, image_identifier: &str, f: impl FnOnce(&mut Image) -> T) -> Result<T> {
        let mut state = self.state()?;
        state
            .get_mut(user)
            .and_then(|images| images.iter_mut().find(|i| i.image_identifier() == image_identifier))
            .map(f)
            .ok_or_else(|| DatabaseError::image_not_found(user, image_identifier).into())
    }
}

impl Database for MemoryDatabase {
    fn insert_image(&self, user: &str, image_identifier: &str, image: &Image) -> Result<()> {
        let now = Utc::now();
        let mut state = self.state()?;
        let images = state.entry(user.to_string()).or_default();

        if let Some(existing) = images.iter_mut().find(|i| i.image_identifier() == image_identifier) {
            existing.set_updated(now);
            return Ok(());
        }

        let mut record = image.without_blob();
        record
            .set_user(user)
            .set_image_identifier(image_identifier)
            .set_added(image.added().unwrap_or(now))
            .set_updated(image.updated().unwrap_or(now));
        if record.original_checksum().is_empty() {
            let checksum = record.checksum().to_string();
            record.set_original_checksum(checksum);
        }

        trace!("Indexed image '{}' for user '{}'", image_identifier, user);
        images.push(record);
        Ok(())
    }

    fn delete_image(&self, user: &str, image_identifier: &str) -> Result<()> {
        let mut state = self.state()?;
        let images = state
            .get_mut(user)
            .ok_or_else(|| DatabaseError::image_not_found(user, image_identifier))?;
        let before = images.len();
        images.retain(|i| i.image_identifier() != image_identifier);

        if images.len() == before {
            return Err(DatabaseError::image_not_found(user, image_identifier).into());
        }
        if images.is_empty() {
            state.remove(user);
        }
        Ok(())
    }

    fn load_image(&self, user: &str, image_identifier: &str) -> Result<Image> {
        self.with_image(user, image_identifier, |image| image.clone())
    }

    fn get_images(&self, user: &str, query: &ImagesQuery) -> Result<ImagesPage> {
        let state = self.state()?;
        let Some(images) = state.get(user) else {
            return Ok(ImagesPage::default());
        };

        // Newest first
        let matching: Vec<&Image> = images
            .iter()
            .rev()
            .filter(|i| query.ids.is_empty() || query.ids.iter().any(|id| id == i.image_identifier()))
            .collect();

        let offset = query.page.saturating_sub(1).saturating_mul(query.limit);
        let images = matching
            .iter()
            .skip(offset)
            .take(query.limit)
            .map(|image| {
                let mut image = (*image).clone();
                if !query.metadata {
                    image.set_metadata(Map::new());
                }
                image
            })
            .collect();

        Ok(ImagesPage {
            images,
            hits: matching.len(),
        })
    }

    fn image_exists(&self, user: &str, image_identifier: &str) -> Result<bool> {
        Ok(self
            .state()?
            .get(user)
            .is_some_and(|images| images.iter().any(|i| i.image_identifier() == image_identifier)))
    }

    fn get_metadata(&self, user: &str, image_identifier: &str) -> Result<Map<String, Value>> {
        self.with_image(user, image_identifier, |image| image.metadata().clone())
    }

    fn update_metadata(&self, user: &str, image_identifier: &str, metadata: &Map<String, Value>) -> Result<()> {
        self.with_image(user, image_identifier, |image| {
            let mut merged = image.metadata().clone();
            for (key, value) in metadata {
                merged.insert(key.clone(), value.clone());
            }
            image.set_metadata(merged).set_updated(Utc::now());
        })
    }

    fn delete_metadata(&self, user: &str, image_identifier: &str) -> Result<()> {
        self.with_image(user, image_identifier, |image| {
            image.set_metadata(Map::new()).set_updated(Utc::now());
        })
    }

    fn get_last_modified(&self, user: &str, image_identifier: Option<&str>) -> Result<Option<DateTime<Utc>>> {
        match image_identifier {
            Some(image_identifier) => self.with_image(user, image_identifier, |image| image.updated()),
            None => Ok(self
                .state()?
                .get(user)
                .and_then(|images| images.iter().filter_map(Image::updated).max())),
        }
    }

    fn get_num_images(&self, user: Option<&str>) -> Result<usize> {
        let state = self.state()?;
        Ok(match user {
            Some(user) => state.get(user).map_or(0, Vec::len),
            None => state.values().map(Vec::len).sum(),
        })
    }

    fn get_num_users(&self) -> Result<usize> {
        Ok(self.state()?.len())
    }

    fn get_num_bytes(&self, user: Option<&str>) -> Result<usize> {
        let state = self.state()?;
        let total = |images: &Vec<Image>| images.iter().map(Image::filesize).sum::<usize>();
        Ok(match user {
            Some(user) => state.get(user).map_or(0, total),
            None => state.values().map(total).sum(),
        })
    }

    fn get_status(&self) -> bool {
        self.images.lock().is_ok()
    }
}
