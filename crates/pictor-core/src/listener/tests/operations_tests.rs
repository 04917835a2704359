use std::sync::Arc;

use ::http::Method;
use serde_json::{Map, Value, json};
use tempfile::TempDir;

use crate::database::{Database, MemoryDatabase};
use crate::event::{ARG_DATABASE, ARG_REQUEST, ARG_RESPONSE, ARG_STORAGE, Event};
use crate::http::request::Request;
use crate::http::response::{Response, SharedResponse};
use crate::http::router::Route;
use crate::kernel::error::Result;
use crate::kernel::{lock, shared};
use crate::listener::{ARG_IMAGE, ARG_METADATA, DatabaseOperations, StorageOperations};
use crate::model::{Image, Model};
use crate::storage::{FilesystemStorage, Storage};
use crate::testing::png_image;

struct Setup {
    database: Arc<MemoryDatabase>,
    storage: Arc<FilesystemStorage>,
    _dir: TempDir,
}

impl Setup {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        Self {
            database: Arc::new(MemoryDatabase::new()),
            storage: Arc::new(FilesystemStorage::new(dir.path())),
            _dir: dir,
        }
    }

    fn event(&self, request: Request) -> (Event, SharedResponse) {
        let response = shared(Response::new());
        let mut event = Event::new();
        event
            .set_argument(ARG_REQUEST, shared(request))
            .set_argument(ARG_RESPONSE, response.clone())
            .set_argument(ARG_DATABASE, self.database.clone() as Arc<dyn Database>)
            .set_argument(ARG_STORAGE, self.storage.clone() as Arc<dyn Storage>);
        (event, response)
    }

    fn image_event(&self, query: &[(&str, &str)]) -> (Event, SharedResponse) {
        let mut request = Request::new(Method::GET, "/users/christer/images/abc");
        for (key, value) in query {
            request = request.with_query(*key, *value);
        }
        request.set_route(Route::new("image").with("user", "christer").with("imageIdentifier", "abc"));
        self.event(request)
    }

    /// Insert `abc` through the operation listeners
    fn insert(&self) -> Result<()> {
        let (mut event, _) = self.image_event(&[]);
        event.set_argument(ARG_IMAGE, shared(png_image("christer", "abc", 4, 2)));
        DatabaseOperations::new().insert_image(&mut event)?;
        StorageOperations::new().insert_image(&mut event)
    }
}

#[test]
fn test_insert_then_load_image() -> Result<()> {
    let setup = Setup::new();
    setup.insert()?;

    let (mut event, response) = setup.image_event(&[]);
    let image = shared(Image::new());
    lock(&response, "response")?.set_model(Model::Image(image.clone()));

    DatabaseOperations::new().load_image(&mut event)?;
    StorageOperations::new().load_image(&mut event)?;

    let image = lock(&image, "image")?;
    assert_eq!(image.mime_type(), "image/png");
    assert_eq!((image.width(), image.height()), (4, 2));
    assert_eq!(image.blob(), png_image("christer", "abc", 4, 2).blob());
    assert!(lock(&response, "response")?.headers().contains_key("Last-Modified"));
    Ok(())
}

#[test]
fn test_load_without_image_model_fails() -> Result<()> {
    let setup = Setup::new();
    setup.insert()?;
    let (mut event, _) = setup.image_event(&[]);
    assert!(DatabaseOperations::new().load_image(&mut event).is_err());
    assert!(StorageOperations::new().load_image(&mut event).is_err());
    Ok(())
}

#[test]
fn test_delete_image() -> Result<()> {
    let setup = Setup::new();
    setup.insert()?;

    let (mut event, _) = setup.image_event(&[]);
    DatabaseOperations::new().delete_image(&mut event)?;
    StorageOperations::new().delete_image(&mut event)?;

    assert!(!setup.database.image_exists("christer", "abc")?);
    assert!(!setup.storage.image_exists("christer", "abc")?);
    assert_eq!(DatabaseOperations::new().delete_image(&mut event).unwrap_err().status_code(), 404);
    Ok(())
}

#[test]
fn test_metadata_operations() -> Result<()> {
    let setup = Setup::new();
    setup.insert()?;
    let operations = DatabaseOperations::new();

    let (mut event, response) = setup.image_event(&[]);
    let mut metadata = Map::new();
    metadata.insert("title".to_string(), json!("Sunset"));
    event.set_argument(ARG_METADATA, metadata);
    operations.update_metadata(&mut event)?;
    operations.load_metadata(&mut event)?;

    {
        let response = lock(&response, "response")?;
        match response.model() {
            Some(Model::Metadata(model)) => assert_eq!(model.data.get("title"), Some(&json!("Sunset"))),
            other => panic!("unexpected model {:?}", other),
        }
        assert!(response.headers().contains_key("Last-Modified"));
    }

    operations.delete_metadata(&mut event)?;
    assert!(setup.database.get_metadata("christer", "abc")?.is_empty());
    Ok(())
}

#[test]
fn test_load_images_reads_query() -> Result<()> {
    let setup = Setup::new();
    setup.insert()?;

    let (mut event, response) =
        setup.image_event(&[("page", "1"), ("limit", "5"), ("fields[]", "width"), ("metadata", "1")]);
    DatabaseOperations::new().load_images(&mut event)?;

    let response = lock(&response, "response")?;
    match response.model() {
        Some(Model::Images(model)) => {
            assert_eq!(model.count(), 1);
            assert_eq!(model.hits, 1);
            assert_eq!(model.limit, 5);
            assert_eq!(model.fields, vec!["width"]);
        }
        other => panic!("unexpected model {:?}", other),
    }
    Ok(())
}

#[test]
fn test_invalid_paging() -> Result<()> {
    let setup = Setup::new();
    for (key, value) in [("page", "0"), ("limit", "-3"), ("limit", "ten")] {
        let (mut event, _) = setup.image_event(&[(key, value)]);
        let error = DatabaseOperations::new().load_images(&mut event).unwrap_err();
        assert_eq!(error.status_code(), 400);
    }
    Ok(())
}

#[test]
fn test_user_and_stats() -> Result<()> {
    let setup = Setup::new();
    setup.insert()?;
    let operations = DatabaseOperations::new();

    let (mut event, response) = setup.image_event(&[]);
    operations.load_user(&mut event)?;
    match lock(&response, "response")?.model() {
        Some(Model::User(model)) => {
            assert_eq!(model.user_id, "christer");
            assert_eq!(model.num_images, 1);
        }
        other => panic!("unexpected model {:?}", other),
    }

    operations.load_stats(&mut event)?;
    match lock(&response, "response")?.model() {
        Some(Model::Stats(model)) => {
            assert_eq!(model.num_images, 1);
            assert_eq!(model.num_users, 1);
            assert!(model.num_bytes > 0);
            assert_eq!(Value::Object(model.custom.clone()), json!({}));
        }
        other => panic!("unexpected model {:?}", other),
    }
    Ok(())
}

#[test]
fn test_missing_route_user() -> Result<()> {
    let setup = Setup::new();
    let (mut event, _) = setup.event(Request::new(Method::GET, "/stats"));
    assert_eq!(DatabaseOperations::new().load_user(&mut event).unwrap_err().status_code(), 400);
    Ok(())
}
