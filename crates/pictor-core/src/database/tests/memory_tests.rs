use serde_json::{Map, Value, json};

use crate::database::{Database, DatabaseError, ImagesQuery, MemoryDatabase};
use crate::kernel::error::{Error, Result};
use crate::model::Image;

fn image(id: &str, filesize: usize) -> Image {
    let mut image = Image::new();
    image
        .set_image_identifier(id)
        .set_mime_type("image/png")
        .set_extension("png")
        .set_dimensions(10, 20)
        .set_blob(vec![7; filesize]);
    image
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("not an object"),
    }
}

#[test]
fn test_insert_and_load() -> Result<()> {
    let database = MemoryDatabase::new();
    database.insert_image("christer", "abc", &image("abc", 5))?;

    let loaded = database.load_image("christer", "abc")?;
    assert_eq!(loaded.user(), "christer");
    assert_eq!(loaded.width(), 10);
    assert_eq!(loaded.filesize(), 5);
    assert!(loaded.blob().is_empty());
    assert!(loaded.added().is_some());
    assert_eq!(loaded.original_checksum(), loaded.checksum());
    assert!(database.image_exists("christer", "abc")?);
    assert!(!database.image_exists("other", "abc")?);
    Ok(())
}

#[test]
fn test_reinsert_only_bumps_update_date() -> Result<()> {
    let database = MemoryDatabase::new();
    database.insert_image("christer", "abc", &image("abc", 5))?;
    let first = database.load_image("christer", "abc")?;

    database.insert_image("christer", "abc", &image("abc", 50))?;
    let second = database.load_image("christer", "abc")?;

    assert_eq!(second.filesize(), 5);
    assert_eq!(second.added(), first.added());
    assert!(second.updated() >= first.updated());
    assert_eq!(database.get_num_images(Some("christer"))?, 1);
    Ok(())
}

#[test]
fn test_delete() -> Result<()> {
    let database = MemoryDatabase::new();
    database.insert_image("christer", "abc", &image("abc", 1))?;

    database.delete_image("christer", "abc")?;
    assert_eq!(database.get_num_users()?, 0);

    let error = database.delete_image("christer", "abc").unwrap_err();
    assert!(matches!(error, Error::Database(DatabaseError::ImageNotFound { .. })));
    assert_eq!(error.status_code(), 404);
    Ok(())
}

#[test]
fn test_listing_is_newest_first_and_paged() -> Result<()> {
    let database = MemoryDatabase::new();
    for id in ["a", "b", "c", "d", "e"] {
        database.insert_image("christer", id, &image(id, 1))?;
    }

    let query = ImagesQuery {
        page: 2,
        limit: 2,
        ..ImagesQuery::default()
    };
    let page = database.get_images("christer", &query)?;
    let ids: Vec<&str> = page.images.iter().map(Image::image_identifier).collect();
    assert_eq!(ids, vec!["c", "b"]);
    assert_eq!(page.hits, 5);

    let query = ImagesQuery {
        ids: vec!["a".to_string(), "e".to_string()],
        ..ImagesQuery::default()
    };
    let page = database.get_images("christer", &query)?;
    let ids: Vec<&str> = page.images.iter().map(Image::image_identifier).collect();
    assert_eq!(ids, vec!["e", "a"]);
    assert_eq!(page.hits, 2);

    assert!(database.get_images("nobody", &ImagesQuery::default())?.images.is_empty());
    Ok(())
}

#[test]
fn test_listing_metadata_is_opt_in() -> Result<()> {
    let database = MemoryDatabase::new();
    database.insert_image("christer", "abc", &image("abc", 1))?;
    database.update_metadata("christer", "abc", &object(json!({"title": "Sunset"})))?;

    let page = database.get_images("christer", &ImagesQuery::default())?;
    assert!(page.images[0].metadata().is_empty());

    let query = ImagesQuery {
        metadata: true,
        ..ImagesQuery::default()
    };
    let page = database.get_images("christer", &query)?;
    assert_eq!(page.images[0].metadata().get("title"), Some(&json!("Sunset")));
    Ok(())
}

#[test]
fn test_metadata_merge_and_delete() -> Result<()> {
    let database = MemoryDatabase::new();
    database.insert_image("christer", "abc", &image("abc", 1))?;

    database.update_metadata("christer", "abc", &object(json!({"a": 1, "b": 2})))?;
    database.update_metadata("christer", "abc", &object(json!({"b": 3, "c": 4})))?;
    assert_eq!(
        Value::Object(database.get_metadata("christer", "abc")?),
        json!({"a": 1, "b": 3, "c": 4})
    );

    database.delete_metadata("christer", "abc")?;
    assert!(database.get_metadata("christer", "abc")?.is_empty());

    assert_eq!(database.get_metadata("christer", "nope").unwrap_err().status_code(), 404);
    Ok(())
}

#[test]
fn test_counters_and_last_modified() -> Result<()> {
    let database = MemoryDatabase::new();
    assert_eq!(database.get_last_modified("christer", None)?, None);

    database.insert_image("christer", "a", &image("a", 10))?;
    database.insert_image("christer", "b", &image("b", 5))?;
    database.insert_image("kristoffer", "c", &image("c", 1))?;

    assert_eq!(database.get_num_images(None)?, 3);
    assert_eq!(database.get_num_images(Some("christer"))?, 2);
    assert_eq!(database.get_num_images(Some("nobody"))?, 0);
    assert_eq!(database.get_num_users()?, 2);
    assert_eq!(database.get_num_bytes(None)?, 16);
    assert_eq!(database.get_num_bytes(Some("christer"))?, 15);

    let latest = database.get_last_modified("christer", None)?;
    let b = database.get_last_modified("christer", Some("b"))?;
    assert!(latest.is_some());
    assert!(latest >= b);
    assert!(database.get_status());
    Ok(())
}
