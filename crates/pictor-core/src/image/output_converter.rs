//! Output conversion: turning an image into another encoding on the way out.
use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::image::codec;
use crate::kernel::error::Result;
use crate::model::Image;

/// One output format a converter can produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedFormat {
    pub mime_types: Vec<String>,
    pub extensions: Vec<String>,
}

impl SupportedFormat {
    pub fn new<M, E>(mime_types: &[M], extensions: &[E]) -> Self
    where
        M: AsRef<str>,
        E: AsRef<str>,
    {
        Self {
            mime_types: mime_types.iter().map(|m| m.as_ref().to_string()).collect(),
            extensions: extensions.iter().map(|e| e.as_ref().to_string()).collect(),
        }
    }
}

/// Something that can re-encode an image.
pub trait OutputConverter: Send + Sync {
    fn supported_formats(&self) -> Vec<SupportedFormat>;

    /// Re-encode `image` for `extension`. Returns `Ok(false)` when this
    /// converter declines, so the next one can try.
    fn convert(&self, image: &mut Image, extension: &str, mime_type: &str) -> Result<bool>;
}

/// Default converter backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateConverter;

impl OutputConverter for ImageCrateConverter {
    fn supported_formats(&self) -> Vec<SupportedFormat> {
        codec::CODEC_FORMATS
            .iter()
            .map(|(mime, extensions, _)| SupportedFormat::new(&[*mime], *extensions))
            .collect()
    }

    fn convert(&self, image: &mut Image, extension: &str, _mime_type: &str) -> Result<bool> {
        let Some(target) = codec::format_for_extension(extension) else {
            return Ok(false);
        };
        let Some(source) = codec::format_for_mime_type(image.mime_type()) else {
            return Ok(false);
        };

        let pixels = codec::decode(image.blob(), source)?;
        let blob = codec::encode(&pixels, target, image.output_quality())?;
        image.set_blob(blob).set_dimensions(pixels.width(), pixels.height());
        Ok(true)
    }
}

/// Registry of output converters, indexed by mime type and extension.
///
/// The first converter registered for a mime type or an extension decides
/// the mime/extension mapping; every converter is still tried when
/// converting.
#[derive(Default, Clone)]
pub struct OutputConverterManager {
    converters_by_extension: Vec<(String, Vec<Arc<dyn OutputConverter>>)>,
    converters_by_mime: Vec<(String, Vec<Arc<dyn OutputConverter>>)>,
    mime_to_extension: Vec<(String, String)>,
    extension_to_mime: Vec<(String, String)>,
}

impl fmt::Debug for OutputConverterManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputConverterManager")
            .field("mime_to_extension", &self.mime_to_extension)
            .field("extension_to_mime", &self.extension_to_mime)
            .finish()
    }
}

fn bucket<'a>(
    buckets: &'a mut Vec<(String, Vec<Arc<dyn OutputConverter>>)>,
    key: &str,
) -> &'a mut Vec<Arc<dyn OutputConverter>> {
    let index = match buckets.iter().position(|(k, _)| k == key) {
        Some(index) => index,
        None => {
            buckets.push((key.to_string(), Vec::new()));
            buckets.len() - 1
        }
    };
    &mut buckets[index].1
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

impl OutputConverterManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager preloaded with the `image` crate converter
    pub fn with_defaults() -> Self {
        let mut manager = Self::new();
        manager.add_converter(Arc::new(ImageCrateConverter));
        manager
    }

    pub fn add_converter(&mut self, converter: Arc<dyn OutputConverter>) -> &mut Self {
        for format in converter.supported_formats() {
            let first_extension = format.extensions.first().cloned();

            for mime in &format.mime_types {
                bucket(&mut self.converters_by_mime, mime).push(converter.clone());
                if let Some(extension) = &first_extension {
                    if lookup(&self.mime_to_extension, mime).is_none() {
                        self.mime_to_extension.push((mime.clone(), extension.clone()));
                    }
                }
            }

            for extension in &format.extensions {
                bucket(&mut self.converters_by_extension, extension).push(converter.clone());
                if let Some(mime) = format.mime_types.first() {
                    if lookup(&self.extension_to_mime, extension).is_none() {
                        self.extension_to_mime.push((extension.clone(), mime.clone()));
                    }
                }
            }
        }
        self
    }

    /// Mime types with at least one converter, in registration order
    pub fn supported_mime_types(&self) -> Vec<String> {
        self.converters_by_mime.iter().map(|(mime, _)| mime.clone()).collect()
    }

    pub fn supported_extensions(&self) -> Vec<String> {
        self.converters_by_extension.iter().map(|(ext, _)| ext.clone()).collect()
    }

    pub fn mime_type_for_extension(&self, extension: &str) -> Option<&str> {
        lookup(&self.extension_to_mime, extension)
    }

    pub fn extension_for_mime_type(&self, mime_type: &str) -> Option<&str> {
        lookup(&self.mime_to_extension, mime_type)
    }

    pub fn mime_to_extension_map(&self) -> &[(String, String)] {
        &self.mime_to_extension
    }

    pub fn extension_to_mime_map(&self) -> &[(String, String)] {
        &self.extension_to_mime
    }

    pub fn supports_extension(&self, extension: &str) -> bool {
        self.converters_by_extension.iter().any(|(ext, _)| ext == extension)
    }

    /// Convert `image` to `extension`.
    ///
    /// Converters registered for the extension are tried first, then those
    /// registered for the mime type. On success the image takes the new
    /// mime type and extension. Returns whether any converter succeeded.
    pub fn convert(&self, image: &mut Image, extension: &str, mime_type: Option<&str>) -> Result<bool> {
        let mime_type = match mime_type.or_else(|| self.mime_type_for_extension(extension)) {
            Some(mime) => mime.to_string(),
            None => return Ok(false),
        };

        let by_extension = self
            .converters_by_extension
            .iter()
            .filter(|(ext, _)| ext == extension)
            .flat_map(|(_, converters)| converters.iter());
        let by_mime = self
            .converters_by_mime
            .iter()
            .filter(|(mime, _)| *mime == mime_type)
            .flat_map(|(_, converters)| converters.iter());

        for converter in by_extension.chain(by_mime) {
            if converter.convert(image, extension, &mime_type)? {
                debug!(
                    "Converted image '{}' to {} ({})",
                    image.image_identifier(),
                    extension,
                    mime_type
                );
                image.set_mime_type(&mime_type).set_extension(extension);
                return Ok(true);
            }
        }

        Ok(false)
    }
}
