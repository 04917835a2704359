use ::http::Method;

use super::pipeline::{Backend, model_of};
use crate::http::request::Request;
use crate::kernel::error::Result;
use crate::kernel::lock;
use crate::model::Model;
use crate::testing::png_blob;

#[test]
fn test_status() -> Result<()> {
    let backend = Backend::new();
    let response = backend.run(Request::new(Method::GET, "/status"))?;

    let response = lock(&response, "response")?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.header("Cache-Control"), Some("no-store, max-age=0, private"));
    match response.model() {
        Some(Model::Status(status)) => assert!(status.database && status.storage),
        other => panic!("unexpected model {:?}", other),
    }
    Ok(())
}

#[test]
fn test_status_with_broken_storage() -> Result<()> {
    let backend = Backend::new().with_broken_storage();
    let response = backend.run(Request::new(Method::HEAD, "/status"))?;

    let response = lock(&response, "response")?;
    assert_eq!(response.status(), 503);
    match response.model() {
        Some(Model::Status(status)) => {
            assert!(status.database);
            assert!(!status.storage);
        }
        other => panic!("unexpected model {:?}", other),
    }
    Ok(())
}

#[test]
fn test_user() -> Result<()> {
    let backend = Backend::new();
    backend.upload("christer", png_blob(1, 1))?;
    backend.upload("christer", png_blob(1, 1))?;

    let response = backend.run(Request::new(Method::GET, "/users/christer"))?;
    match model_of(&response) {
        Some(Model::User(user)) => {
            assert_eq!(user.user_id, "christer");
            assert_eq!(user.num_images, 2);
        }
        other => panic!("unexpected model {:?}", other),
    }

    let response = backend.run(Request::new(Method::GET, "/users/nobody.json"))?;
    match model_of(&response) {
        Some(Model::User(user)) => assert_eq!(user.num_images, 0),
        other => panic!("unexpected model {:?}", other),
    }
    Ok(())
}

#[test]
fn test_stats() -> Result<()> {
    let backend = Backend::new();
    let blob = png_blob(2, 2);
    let size = blob.len();
    backend.upload("christer", blob.clone())?;
    backend.upload("kristoffer", blob)?;

    let response = backend.run(Request::new(Method::GET, "/stats"))?;
    match model_of(&response) {
        Some(Model::Stats(stats)) => {
            assert_eq!(stats.num_images, 2);
            assert_eq!(stats.num_users, 2);
            assert_eq!(stats.num_bytes, 2 * size);
            assert!(stats.custom.is_empty());
        }
        other => panic!("unexpected model {:?}", other),
    }
    Ok(())
}
