//! Decoding and encoding through the `image` crate.
//!
//! | Operation | Crate API |
//! |-----------|-----------|
//! | Sniff format | `image::guess_format` |
//! | Decode | `image::load_from_memory_with_format` |
//! | Encode JPEG | `image::codecs::jpeg::JpegEncoder::new_with_quality` |
//! | Encode PNG/GIF | `DynamicImage::write_to` |
//! | Encode WebP | `image::codecs::webp::WebPEncoder::new_lossless` |
use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat};

use crate::kernel::error::{Error, Result};

/// Quality used for JPEG output when the client asked for none
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Formats with both a decoder and an encoder compiled in: mime type, extensions, format
pub const CODEC_FORMATS: &[(&str, &[&str], ImageFormat)] = &[
    ("image/jpeg", &["jpg", "jpeg"], ImageFormat::Jpeg),
    ("image/png", &["png"], ImageFormat::Png),
    ("image/gif", &["gif"], ImageFormat::Gif),
    ("image/webp", &["webp"], ImageFormat::WebP),
];

pub fn format_for_mime_type(mime_type: &str) -> Option<ImageFormat> {
    CODEC_FORMATS
        .iter()
        .find(|(mime, _, _)| *mime == mime_type)
        .map(|(_, _, format)| *format)
}

pub fn format_for_extension(extension: &str) -> Option<ImageFormat> {
    let extension = extension.to_ascii_lowercase();
    CODEC_FORMATS
        .iter()
        .find(|(_, extensions, _)| extensions.contains(&extension.as_str()))
        .map(|(_, _, format)| *format)
}

/// Mime type of a blob, judged from its magic bytes
pub fn sniff_mime_type(blob: &[u8]) -> Option<&'static str> {
    let format = image::guess_format(blob).ok()?;
    CODEC_FORMATS
        .iter()
        .find(|(_, _, candidate)| *candidate == format)
        .map(|(mime, _, _)| *mime)
}

pub fn decode(blob: &[u8], format: ImageFormat) -> Result<DynamicImage> {
    image::load_from_memory_with_format(blob, format).map_err(|e| Error::codec(e, "decode"))
}

/// Encode `pixels`. `quality` only affects JPEG.
pub fn encode(pixels: &DynamicImage, format: ImageFormat, quality: Option<u8>) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();

    match format {
        ImageFormat::Jpeg => {
            let quality = quality.unwrap_or(DEFAULT_JPEG_QUALITY).clamp(1, 100);
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(pixels.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
            rgb.write_with_encoder(encoder)
                .map_err(|e| Error::codec(e, "encode jpeg"))?;
        }
        ImageFormat::WebP => {
            let rgba = DynamicImage::ImageRgba8(pixels.to_rgba8());
            let encoder = WebPEncoder::new_lossless(&mut buffer);
            rgba.write_with_encoder(encoder)
                .map_err(|e| Error::codec(e, "encode webp"))?;
        }
        ImageFormat::Png | ImageFormat::Gif => {
            let rgba = DynamicImage::ImageRgba8(pixels.to_rgba8());
            rgba.write_to(&mut Cursor::new(&mut buffer), format)
                .map_err(|e| Error::codec(e, "encode"))?;
        }
        other => {
            return Err(Error::unsupported_media_type(format!(
                "Unsupported output format: {:?}",
                other
            )));
        }
    }

    Ok(buffer)
}
