use std::any::Any;

use ::http::header::LAST_MODIFIED;
use chrono::Utc;
use log::debug;
use serde_json::{Map, Value};

use crate::database::ImagesQuery;
use crate::event::Event;
use crate::event::error::EventSystemError;
use crate::event::listener::{CallbackSpec, Listener, ListenerDefinition, Subscriptions};
use crate::http::date::format_date;
use crate::kernel::Shared;
use crate::kernel::constants::DEFAULT_PAGE_LIMIT;
use crate::kernel::error::{Error, Result};
use crate::kernel::lock;
use crate::listener::{ARG_IMAGE, ARG_METADATA, positive_param, route_image, route_user};
use crate::model::{Image, ImagesModel, MetadataModel, Model, StatsModel, UserModel};

/// Carries out the `db.*` events against the event's database.
#[derive(Debug, Clone, Default)]
pub struct DatabaseOperations;

fn truthy(value: &str) -> bool {
    !matches!(value, "" | "0" | "false")
}

impl DatabaseOperations {
    pub fn new() -> Self {
        Self
    }

    /// Index the image passed in the `image` argument
    pub fn insert_image(&self, event: &mut Event) -> Result<()> {
        let user = route_user(event)?;
        let image: Shared<Image> = event.get_argument(ARG_IMAGE)?;
        let image = lock(&image, "image")?;
        event.database()?.insert_image(&user, image.image_identifier(), &image)
    }

    pub fn delete_image(&self, event: &mut Event) -> Result<()> {
        let (user, image_identifier) = route_image(event)?;
        event.database()?.delete_image(&user, &image_identifier)
    }

    /// Fill the image model on the response with what the database knows
    pub fn load_image(&self, event: &mut Event) -> Result<()> {
        let (user, image_identifier) = route_image(event)?;
        let record = event.database()?.load_image(&user, &image_identifier)?;

        let response = event.response()?;
        let mut response = lock(&response, "response")?;
        let image = match response.model() {
            Some(Model::Image(image)) => image.clone(),
            _ => return Err(Error::Other("No image model to load into".to_string())),
        };

        let mut image = lock(&image, "image")?;
        image
            .set_user(record.user())
            .set_image_identifier(record.image_identifier())
            .set_mime_type(record.mime_type())
            .set_extension(record.extension())
            .set_dimensions(record.width(), record.height())
            .set_filesize(record.filesize())
            .set_checksum(record.checksum())
            .set_original_checksum(record.original_checksum())
            .set_metadata(record.metadata().clone());
        if let Some(added) = record.added() {
            image.set_added(added);
        }
        if let Some(updated) = record.updated() {
            image.set_updated(updated);
            response.set_header(LAST_MODIFIED, &format_date(&updated))?;
        }
        Ok(())
    }

    /// List the route user's images according to the query string
    pub fn load_images(&self, event: &mut Event) -> Result<()> {
        let user = route_user(event)?;
        let request = event.request()?;

        let (query, fields) = {
            let request = lock(&request, "request")?;
            let query = ImagesQuery {
                page: positive_param(&request, "page", 1)?,
                limit: positive_param(&request, "limit", DEFAULT_PAGE_LIMIT)?,
                ids: request.query_values("ids").into_iter().map(str::to_owned).collect(),
                metadata: request.query_param("metadata").is_some_and(truthy),
            };
            let fields: Vec<String> = request.query_values("fields").into_iter().map(str::to_owned).collect();
            (query, fields)
        };

        let page = event.database()?.get_images(&user, &query)?;
        debug!("Loaded {} of {} images for '{}'", page.images.len(), page.hits, user);

        let model = ImagesModel {
            images: page.images,
            fields,
            hits: page.hits,
            page: query.page,
            limit: query.limit,
        };
        lock(&*event.response()?, "response")?.set_model(Model::Images(model));
        Ok(())
    }

    pub fn delete_metadata(&self, event: &mut Event) -> Result<()> {
        let (user, image_identifier) = route_image(event)?;
        event.database()?.delete_metadata(&user, &image_identifier)
    }

    /// Merge the `metadata` argument into the image's metadata
    pub fn update_metadata(&self, event: &mut Event) -> Result<()> {
        let (user, image_identifier) = route_image(event)?;
        let metadata: Map<String, Value> = event.get_argument(ARG_METADATA)?;
        event.database()?.update_metadata(&user, &image_identifier, &metadata)
    }

    pub fn load_metadata(&self, event: &mut Event) -> Result<()> {
        let (user, image_identifier) = route_image(event)?;
        let database = event.database()?;
        let data = database.get_metadata(&user, &image_identifier)?;
        let last_modified = database.get_last_modified(&user, Some(&image_identifier))?;

        let response = event.response()?;
        let mut response = lock(&response, "response")?;
        response.set_model(Model::Metadata(MetadataModel { data }));
        if let Some(last_modified) = last_modified {
            response.set_header(LAST_MODIFIED, &format_date(&last_modified))?;
        }
        Ok(())
    }

    pub fn load_user(&self, event: &mut Event) -> Result<()> {
        let user = route_user(event)?;
        let database = event.database()?;

        let model = UserModel {
            num_images: database.get_num_images(Some(&user))?,
            last_modified: database.get_last_modified(&user, None)?.unwrap_or_else(Utc::now),
            user_id: user,
        };
        lock(&*event.response()?, "response")?.set_model(Model::User(model));
        Ok(())
    }

    pub fn load_stats(&self, event: &mut Event) -> Result<()> {
        let database = event.database()?;
        let model = StatsModel {
            num_images: database.get_num_images(None)?,
            num_users: database.get_num_users()?,
            num_bytes: database.get_num_bytes(None)?,
            custom: Map::new(),
        };
        lock(&*event.response()?, "response")?.set_model(Model::Stats(model));
        Ok(())
    }
}

impl Listener for DatabaseOperations {
    fn handle(&mut self, method: &str, event: &mut Event) -> Result<()> {
        match method {
            "insertImage" => self.insert_image(event),
            "deleteImage" => self.delete_image(event),
            "loadImage" => self.load_image(event),
            "loadImages" => self.load_images(event),
            "deleteMetadata" => self.delete_metadata(event),
            "updateMetadata" => self.update_metadata(event),
            "loadMetadata" => self.load_metadata(event),
            "loadUser" => self.load_user(event),
            "loadStats" => self.load_stats(event),
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

impl ListenerDefinition for DatabaseOperations {
    const IDENTIFIER: &'static str = "database-operations";

    fn subscribed_events() -> Subscriptions {
        [
            ("db.image.insert", "insertImage"),
            ("db.image.delete", "deleteImage"),
            ("db.image.load", "loadImage"),
            ("db.images.load", "loadImages"),
            ("db.metadata.delete", "deleteMetadata"),
            ("db.metadata.update", "updateMetadata"),
            ("db.metadata.load", "loadMetadata"),
            ("db.user.load", "loadUser"),
            ("db.stats.load", "loadStats"),
        ]
        .into_iter()
        .map(|(event, method)| (event.to_string(), CallbackSpec::method(method)))
        .collect()
    }

    fn from_params(_params: &Value) -> Result<Self> {
        Ok(Self::new())
    }
}
