use std::any::Any;

use log::debug;
use serde_json::{Map, Value, json};

use crate::event::Event;
use crate::event::listener::{CallbackSpec, Listener, ListenerDefinition, Subscriptions};
use crate::kernel::error::Result;
use crate::kernel::{lock, shared};
use crate::listener::route_image;
use crate::model::{ArrayModel, Image, Model};
use crate::resource::unknown_method;

/// `/users/{user}/images/{imageIdentifier}`: fetch or delete one image.
///
/// A fetch loads the index entry and the bytes into an image model, reports
/// the stored properties in `X-Pictor-Original*` headers, then hands the
/// image to `image.loaded` and `image.transform` listeners.
#[derive(Debug, Clone, Default)]
pub struct ImageResource;

impl ImageResource {
    pub fn get(&self, event: &mut Event) -> Result<()> {
        let (user, image_identifier) = route_image(event)?;

        let mut image = Image::new();
        image.set_user(user).set_image_identifier(image_identifier);
        let image = shared(image);

        lock(&*event.response()?, "response")?.set_model(Model::Image(image.clone()));

        let manager = event.manager()?;
        manager.trigger("db.image.load")?.trigger("storage.image.load")?;

        let original = {
            let image = lock(&image, "image")?;
            [
                ("x-pictor-originalmimetype", image.mime_type().to_string()),
                ("x-pictor-originalwidth", image.width().to_string()),
                ("x-pictor-originalheight", image.height().to_string()),
                ("x-pictor-originalfilesize", image.filesize().to_string()),
                ("x-pictor-originalextension", image.extension().to_string()),
            ]
        };
        {
            let response = event.response()?;
            let mut response = lock(&response, "response")?;
            for (name, value) in original {
                response.set_header(name, &value)?;
            }
        }

        manager.trigger("image.loaded")?.trigger("image.transform")?;
        Ok(())
    }

    pub fn delete(&self, event: &mut Event) -> Result<()> {
        let (_, image_identifier) = route_image(event)?;

        event
            .manager()?
            .trigger("db.image.delete")?
            .trigger("storage.image.delete")?;
        debug!("Deleted image '{}'", image_identifier);

        let mut data = Map::new();
        data.insert("imageIdentifier".to_string(), json!(image_identifier));
        lock(&*event.response()?, "response")?.set_model(Model::Array(ArrayModel::new(data)));
        Ok(())
    }
}

impl Listener for ImageResource {
    fn handle(&mut self, method: &str, event: &mut Event) -> Result<()> {
        match method {
            "get" | "head" => self.get(event),
            "delete" => self.delete(event),
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

impl ListenerDefinition for ImageResource {
    const IDENTIFIER: &'static str = "image";

    fn subscribed_events() -> Subscriptions {
        vec![
            ("image.get".to_string(), CallbackSpec::method("get")),
            ("image.head".to_string(), CallbackSpec::method("head")),
            ("image.delete".to_string(), CallbackSpec::method("delete")),
        ]
    }

    fn from_params(_params: &Value) -> Result<Self> {
        Ok(Self)
    }
}
