use std::any::Any;

use ::http::StatusCode;
use chrono::Utc;
use log::{info, warn};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::event::listener::{CallbackSpec, Listener, ListenerDefinition, Subscriptions};
use crate::event::{Arguments, Event, argument};
use crate::kernel::constants::error_codes;
use crate::kernel::error::{Error, Result};
use crate::kernel::{lock, shared};
use crate::listener::{ARG_IMAGE, route_user};
use crate::model::{ArrayModel, Image, Model};
use crate::resource::unknown_method;

/// `/users/{user}/images`: listing and uploading.
#[derive(Debug, Clone, Default)]
pub struct ImagesResource;

impl ImagesResource {
    /// Build an image from the request body
    fn prepare_image(&self, event: &Event) -> Result<Image> {
        let body = lock(&*event.request()?, "request")?.body().to_vec();
        if body.is_empty() {
            return Err(Error::http_with_code(400, "No image attached", error_codes::IMAGE_NO_IMAGE_ATTACHED));
        }

        let loaders = event.input_loader_manager()?;
        let mime_type = loaders.detect_mime_type(&body).ok_or_else(|| {
            Error::http_with_code(415, "Unsupported image type", error_codes::IMAGE_UNSUPPORTED_MIMETYPE)
        })?;
        let extension = loaders.extension_for_mime_type(&mime_type).unwrap_or_default().to_string();

        let pixels = loaders
            .load(&mime_type, &body)
            .ok()
            .flatten()
            .ok_or_else(|| Error::http_with_code(415, "Invalid image", error_codes::IMAGE_BROKEN_IMAGE))?;

        let now = Utc::now();
        let mut image = Image::new();
        image
            .set_image_identifier(Uuid::new_v4().simple().to_string())
            .set_mime_type(&mime_type)
            .set_extension(extension)
            .set_dimensions(pixels.width(), pixels.height())
            .set_blob(body)
            .set_added(now)
            .set_updated(now);
        let checksum = image.checksum().to_string();
        image.set_original_checksum(checksum);
        Ok(image)
    }

    pub fn get(&self, event: &mut Event) -> Result<()> {
        event.manager()?.trigger("db.images.load")?;
        Ok(())
    }

    /// Store an upload: index it, then write the bytes. The index entry is
    /// removed again if the bytes cannot be stored.
    pub fn post(&self, event: &mut Event) -> Result<()> {
        let user = route_user(event)?;
        let mut image = self.prepare_image(event)?;
        image.set_user(user.as_str());

        let (image_identifier, width, height, extension) = (
            image.image_identifier().to_string(),
            image.width(),
            image.height(),
            image.extension().to_string(),
        );

        let mut arguments = Arguments::new();
        arguments.insert(ARG_IMAGE.to_string(), argument(shared(image)));

        let manager = event.manager()?;
        manager.trigger_with("db.image.insert", arguments.clone())?;

        if let Err(e) = manager.trigger_with("storage.image.insert", arguments) {
            warn!("Could not store image '{}', removing it from the database: {}", image_identifier, e);
            event.database()?.delete_image(&user, &image_identifier)?;
            return Err(e);
        }

        info!("Stored image '{}' for user '{}'", image_identifier, user);

        let mut data = Map::new();
        data.insert("imageIdentifier".to_string(), json!(image_identifier));
        data.insert("width".to_string(), json!(width));
        data.insert("height".to_string(), json!(height));
        data.insert("extension".to_string(), json!(extension));

        let response = event.response()?;
        let mut response = lock(&response, "response")?;
        response.set_status(StatusCode::CREATED).set_model(Model::Array(ArrayModel::new(data)));
        Ok(())
    }
}

impl Listener for ImagesResource {
    fn handle(&mut self, method: &str, event: &mut Event) -> Result<()> {
        match method {
            "get" | "head" => self.get(event),
            "post" => self.post(event),
            other => Err(unknown_method(Self::IDENTIFIER, other)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ListenerDefinition for ImagesResource {
    const IDENTIFIER: &'static str = "images";

    fn subscribed_events() -> Subscriptions {
        vec![
            ("images.get".to_string(), CallbackSpec::method("get")),
            ("images.head".to_string(), CallbackSpec::method("head")),
            ("images.post".to_string(), CallbackSpec::method("post")),
        ]
    }

    fn from_params(_params: &Value) -> Result<Self> {
        Ok(Self)
    }
}
