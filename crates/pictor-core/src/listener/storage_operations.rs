use std::any::Any;

use ::http::header::LAST_MODIFIED;
use serde_json::Value;

use crate::event::Event;
use crate::event::error::EventSystemError;
use crate::event::listener::{CallbackSpec, Listener, ListenerDefinition, Subscriptions};
use crate::http::date::format_date;
use crate::kernel::Shared;
use crate::kernel::error::{Error, Result};
use crate::kernel::lock;
use crate::listener::{ARG_IMAGE, route_image, route_user};
use crate::model::{Image, Model};

/// Carries out the `storage.*` events against the event's storage.
#[derive(Debug, Clone, Default)]
pub struct StorageOperations;

impl StorageOperations {
    pub fn new() -> Self {
        Self
    }

    pub fn insert_image(&self, event: &mut Event) -> Result<()> {
        let user = route_user(event)?;
        let image: Shared<Image> = event.get_argument(ARG_IMAGE)?;
        let image = lock(&image, "image")?;
        event.storage()?.store(&user, image.image_identifier(), image.blob())
    }

    pub fn delete_image(&self, event: &mut Event) -> Result<()> {
        let (user, image_identifier) = route_image(event)?;
        event.storage()?.delete(&user, &image_identifier)
    }

    /// Put the stored bytes into the image model on the response
    pub fn load_image(&self, event: &mut Event) -> Result<()> {
        let (user, image_identifier) = route_image(event)?;
        let storage = event.storage()?;
        let blob = storage.get_image(&user, &image_identifier)?;
        let last_modified = storage.get_last_modified(&user, &image_identifier)?;

        let response = event.response()?;
        let mut response = lock(&response, "response")?;
        let image = match response.model() {
            Some(Model::Image(image)) => image.clone(),
            _ => return Err(Error::Other("No image model to load into".to_string())),
        };

        lock(&image, "image")?.set_blob(blob);
        if !response.headers().contains_key(LAST_MODIFIED) {
            response.set_header(LAST_MODIFIED, &format_date(&last_modified))?;
        }
        Ok(())
    }
}

impl Listener for StorageOperations {
    fn handle(&mut self, method: &str, event: &mut Event) -> Result<()> {
        match method {
            "insertImage" => self.insert_image(event),
            "deleteImage" => self.delete_image(event),
            "loadImage" => self.load_image(event),
            other => Err(EventSystemError::UnknownMethod {
                handler: Self::IDENTIFIER.to_string(),
                method: other.to_string(),
            }
            .into()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ListenerDefinition for StorageOperations {
    const IDENTIFIER: &'static str = "storage-operations";

    fn subscribed_events() -> Subscriptions {
        vec![
            ("storage.image.insert".to_string(), CallbackSpec::method("insertImage")),
            ("storage.image.delete".to_string(), CallbackSpec::method("deleteImage")),
            ("storage.image.load".to_string(), CallbackSpec::method("loadImage")),
        ]
    }

    fn from_params(_params: &Value) -> Result<Self> {
        Ok(Self::new())
    }
}
