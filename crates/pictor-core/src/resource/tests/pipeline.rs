//! Minimal event pipeline for driving resources without an application.
use std::path::Path;
use std::sync::Arc;

use ::http::Method;
use serde_json::Value;
use tempfile::TempDir;

use crate::auth::{AccessControl, ArrayAdapter};
use crate::database::{Database, MemoryDatabase};
use crate::event::listener::{ListenerDefinition, SharedListener};
use crate::event::manager::EventManager;
use crate::event::{
    ARG_ACCESS_CONTROL, ARG_DATABASE, ARG_INPUT_LOADER_MANAGER, ARG_REQUEST, ARG_RESPONSE, ARG_STORAGE,
    ARG_TRANSFORMATION_MANAGER, Event,
};
use crate::http::request::Request;
use crate::http::response::{Response, SharedResponse};
use crate::http::router::Router;
use crate::image::{InputLoaderManager, TransformationManager};
use crate::kernel::application::default_catalog;
use crate::kernel::error::Result;
use crate::kernel::{lock, shared};
use crate::model::Model;
use crate::storage::{FilesystemStorage, Storage};

const LISTENERS: [&str; 12] = [
    "status",
    "stats",
    "user",
    "images",
    "image",
    "metadata",
    "groups",
    "group",
    "accessrules",
    "accessrule",
    "database-operations",
    "storage-operations",
];

pub(super) struct Backend {
    pub database: Arc<MemoryDatabase>,
    pub storage: Arc<FilesystemStorage>,
    pub access_control: Option<Arc<dyn AccessControl>>,
    pub dir: TempDir,
}

impl Backend {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        Self {
            database: Arc::new(MemoryDatabase::new()),
            storage: Arc::new(FilesystemStorage::new(dir.path().join("images"))),
            access_control: None,
            dir,
        }
    }

    /// Storage rooted below a regular file, so every write fails
    pub fn with_broken_storage(mut self) -> Self {
        let file = self.dir.path().join("not-a-dir");
        std::fs::write(&file, b"").expect("write file");
        self.storage = Arc::new(FilesystemStorage::new(Path::new(&file).join("images")));
        self
    }

    pub fn with_access_control(mut self, config: Value) -> Self {
        let adapter = ArrayAdapter::from_value(&config).expect("valid access control");
        self.access_control = Some(Arc::new(adapter));
        self
    }

    /// Route `request` and trigger its resource event
    pub fn run(&self, request: Request) -> Result<SharedResponse> {
        let mut request = request;
        let route = Router::new()?.route(request.method(), request.path())?;
        let event_name = format!("{}.{}", route.name(), request.method().as_str().to_ascii_lowercase());
        request.set_route(route);

        let response = shared(Response::new());
        let transformations = shared(TransformationManager::new());

        let mut template = Event::new();
        template
            .set_argument(ARG_REQUEST, shared(request))
            .set_argument(ARG_RESPONSE, response.clone())
            .set_argument(ARG_DATABASE, self.database.clone() as Arc<dyn Database>)
            .set_argument(ARG_STORAGE, self.storage.clone() as Arc<dyn Storage>)
            .set_argument(ARG_INPUT_LOADER_MANAGER, Arc::new(InputLoaderManager::with_defaults()))
            .set_argument(ARG_TRANSFORMATION_MANAGER, transformations.clone());
        if let Some(access_control) = &self.access_control {
            template.set_argument(ARG_ACCESS_CONTROL, access_control.clone());
        }

        let manager = EventManager::with_catalog(Arc::new(default_catalog()));
        manager.set_event_template(template)?;
        for identifier in LISTENERS {
            manager.add_listener(identifier, identifier, Value::Null, None)?;
        }
        let listener: SharedListener = transformations;
        manager.add_listener_instance(
            TransformationManager::IDENTIFIER,
            listener,
            TransformationManager::subscribed_events(),
        )?;

        manager.trigger(&event_name)?;
        Ok(response)
    }

    /// Upload `blob` for `user`, returning the new image identifier
    pub fn upload(&self, user: &str, blob: Vec<u8>) -> Result<String> {
        let response = self.run(Request::new(Method::POST, format!("/users/{}/images", user)).with_body(blob))?;
        let response = lock(&response, "response")?;
        match response.model() {
            Some(Model::Array(model)) => Ok(model.data["imageIdentifier"].as_str().unwrap_or_default().to_string()),
            other => panic!("unexpected model {:?}", other),
        }
    }
}

/// Model currently on `response`
pub(super) fn model_of(response: &SharedResponse) -> Option<Model> {
    lock(response, "response").ok().and_then(|r| r.model().cloned())
}
