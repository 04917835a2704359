//! Input loading: recognising and decoding uploaded images.
use std::fmt;
use std::sync::Arc;

use image::DynamicImage;

use crate::image::codec;
use crate::kernel::error::Result;

/// Something that can decode a blob of a given mime type.
pub trait InputLoader: Send + Sync {
    /// Mime types this loader handles, each with its preferred extension
    fn supported_mime_types(&self) -> Vec<(String, String)>;

    /// Decode `blob`. Returns `Ok(None)` to let the next loader try.
    fn load(&self, mime_type: &str, blob: &[u8]) -> Result<Option<DynamicImage>>;
}

/// Default loader backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateLoader;

impl InputLoader for ImageCrateLoader {
    fn supported_mime_types(&self) -> Vec<(String, String)> {
        codec::CODEC_FORMATS
            .iter()
            .filter_map(|(mime, extensions, _)| {
                extensions.first().map(|ext| (mime.to_string(), ext.to_string()))
            })
            .collect()
    }

    fn load(&self, mime_type: &str, blob: &[u8]) -> Result<Option<DynamicImage>> {
        match codec::format_for_mime_type(mime_type) {
            Some(format) => codec::decode(blob, format).map(Some),
            None => Ok(None),
        }
    }
}

/// Registry of input loaders keyed by mime type. Loaders added later are
/// tried first.
#[derive(Default, Clone)]
pub struct InputLoaderManager {
    loaders: Vec<(String, Vec<Arc<dyn InputLoader>>)>,
    extensions: Vec<(String, String)>,
}

impl fmt::Debug for InputLoaderManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputLoaderManager")
            .field("mime_types", &self.supported_mime_types())
            .finish()
    }
}

impl InputLoaderManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut manager = Self::new();
        manager.add_loader(Arc::new(ImageCrateLoader));
        manager
    }

    pub fn add_loader(&mut self, loader: Arc<dyn InputLoader>) -> &mut Self {
        for (mime, extension) in loader.supported_mime_types() {
            match self.loaders.iter_mut().find(|(m, _)| *m == mime) {
                Some((_, loaders)) => loaders.insert(0, loader.clone()),
                None => self.loaders.push((mime.clone(), vec![loader.clone()])),
            }
            if !self.extensions.iter().any(|(m, _)| *m == mime) {
                self.extensions.push((mime, extension));
            }
        }
        self
    }

    pub fn supported_mime_types(&self) -> Vec<String> {
        self.loaders.iter().map(|(mime, _)| mime.clone()).collect()
    }

    pub fn is_supported(&self, mime_type: &str) -> bool {
        self.loaders.iter().any(|(mime, _)| mime == mime_type)
    }

    pub fn extension_for_mime_type(&self, mime_type: &str) -> Option<&str> {
        self.extensions
            .iter()
            .find(|(mime, _)| mime == mime_type)
            .map(|(_, extension)| extension.as_str())
    }

    /// Mime type of a blob judged by its content, if it is one we can load
    pub fn detect_mime_type(&self, blob: &[u8]) -> Option<String> {
        codec::sniff_mime_type(blob)
            .filter(|mime| self.is_supported(mime))
            .map(str::to_string)
    }

    /// Decode `blob` with the first loader that accepts it
    pub fn load(&self, mime_type: &str, blob: &[u8]) -> Result<Option<DynamicImage>> {
        let Some((_, loaders)) = self.loaders.iter().find(|(mime, _)| mime == mime_type) else {
            return Ok(None);
        };

        for loader in loaders {
            if let Some(pixels) = loader.load(mime_type, blob)? {
                return Ok(Some(pixels));
            }
        }

        Ok(None)
    }
}
