use std::any::Any;

use serde_json::{Map, Value, json};

use crate::event::listener::{CallbackSpec, Listener, ListenerDefinition, Subscriptions};
use crate::event::{Arguments, Event, argument};
use crate::kernel::error::{Error, Result};
use crate::kernel::lock;
use crate::listener::{ARG_METADATA, route_image};
use crate::model::{ArrayModel, Model};
use crate::resource::unknown_method;

/// `/users/{user}/images/{imageIdentifier}/metadata`.
///
/// `post` merges the body into the stored metadata, `put` replaces it.
#[derive(Debug, Clone, Default)]
pub struct MetadataResource;

/// Parse the request body as a JSON object
fn request_metadata(event: &Event) -> Result<Map<String, Value>> {
    let request = event.request()?;
    let request = lock(&request, "request")?;
    let body = request.body();

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::bad_request("Missing JSON data"));
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(Error::bad_request("Invalid JSON data")),
    }
}

impl MetadataResource {
    /// Runs ahead of `post` and `put` so bad payloads never reach the database
    pub fn validate_metadata(&self, event: &mut Event) -> Result<()> {
        request_metadata(event).map(|_| ())
    }

    pub fn get(&self, event: &mut Event) -> Result<()> {
        event.manager()?.trigger("db.metadata.load")?;
        Ok(())
    }

    pub fn post(&self, event: &mut Event) -> Result<()> {
        let metadata = request_metadata(event)?;
        let mut arguments = Arguments::new();
        arguments.insert(ARG_METADATA.to_string(), argument(metadata));

        event.manager()?.trigger_with("db.metadata.update", arguments)?;
        self.respond(event)
    }

    pub fn put(&self, event: &mut Event) -> Result<()> {
        let metadata = request_metadata(event)?;
        let mut arguments = Arguments::new();
        arguments.insert(ARG_METADATA.to_string(), argument(metadata));

        event
            .manager()?
            .trigger("db.metadata.delete")?
            .trigger_with("db.metadata.update", arguments)?;
        self.respond(event)
    }

    pub fn delete(&self, event: &mut Event) -> Result<()> {
        event.manager()?.trigger("db.metadata.delete")?;
        self.respond(event)
    }

    fn respond(&self, event: &Event) -> Result<()> {
        let (_, image_identifier) = route_image(event)?;
        let mut data = Map::new();
        data.insert("imageIdentifier".to_string(), json!(image_identifier));
        lock(&*event.response()?, "response")?.set_model(Model::Array(ArrayModel::new(data)));
        Ok(())
    }
}

impl Listener for MetadataResource {
    fn handle(&mut self, method: &str, event: &mut Event) -> Result<()> {
        match method {
            "validateMetadata" => self.validate_metadata(event),
            "get" | "head" => self.get(event),
            "post" => self.post(event),
            "put" => self.put(event),
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

impl ListenerDefinition for MetadataResource {
    const IDENTIFIER: &'static str = "metadata";

    fn subscribed_events() -> Subscriptions {
        vec![
            ("metadata.get".to_string(), CallbackSpec::method("get")),
            ("metadata.head".to_string(), CallbackSpec::method("head")),
            ("metadata.post".to_string(), CallbackSpec::prioritized("validateMetadata", 10)),
            ("metadata.post".to_string(), CallbackSpec::method("post")),
            ("metadata.put".to_string(), CallbackSpec::prioritized("validateMetadata", 10)),
            ("metadata.put".to_string(), CallbackSpec::method("put")),
            ("metadata.delete".to_string(), CallbackSpec::method("delete")),
        ]
    }

    fn from_params(_params: &Value) -> Result<Self> {
        Ok(Self)
    }
}
