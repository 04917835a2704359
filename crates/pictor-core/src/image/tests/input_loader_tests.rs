use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::DynamicImage;

use crate::image::{InputLoader, InputLoaderManager};
use crate::kernel::error::Result;
use crate::testing::{jpeg_blob, png_blob};

#[test]
fn test_default_loaders() -> Result<()> {
    let manager = InputLoaderManager::with_defaults();

    assert_eq!(
        manager.supported_mime_types(),
        vec!["image/jpeg", "image/png", "image/gif", "image/webp"]
    );
    assert_eq!(manager.extension_for_mime_type("image/jpeg"), Some("jpg"));
    assert!(!manager.is_supported("image/bmp"));

    let pixels = manager.load("image/png", &png_blob(4, 3))?.expect("png decodes");
    assert_eq!((pixels.width(), pixels.height()), (4, 3));
    assert!(manager.load("image/bmp", b"BM")?.is_none());
    Ok(())
}

#[test]
fn test_mime_detection_uses_content() {
    let manager = InputLoaderManager::with_defaults();

    assert_eq!(manager.detect_mime_type(&png_blob(1, 1)).as_deref(), Some("image/png"));
    assert_eq!(manager.detect_mime_type(&jpeg_blob(1, 1)).as_deref(), Some("image/jpeg"));
    assert_eq!(manager.detect_mime_type(b"definitely not an image"), None);
    assert_eq!(InputLoaderManager::new().detect_mime_type(&png_blob(1, 1)), None);
}

#[test]
fn test_broken_blob_is_an_error() {
    let manager = InputLoaderManager::with_defaults();
    let mut blob = png_blob(2, 2);
    blob.truncate(20);

    assert!(manager.load("image/png", &blob).is_err());
}

/// Declines everything, counting the attempts
struct Declining(Arc<AtomicUsize>);

impl InputLoader for Declining {
    fn supported_mime_types(&self) -> Vec<(String, String)> {
        vec![("image/png".to_string(), "pngx".to_string())]
    }

    fn load(&self, _mime_type: &str, _blob: &[u8]) -> Result<Option<DynamicImage>> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

#[test]
fn test_later_loaders_are_tried_first() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut manager = InputLoaderManager::with_defaults();
    manager.add_loader(Arc::new(Declining(calls.clone())));

    // Declining goes first, then the default loader decodes
    assert!(manager.load("image/png", &png_blob(2, 2))?.is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // The first registration keeps the extension
    assert_eq!(manager.extension_for_mime_type("image/png"), Some("png"));
    Ok(())
}
