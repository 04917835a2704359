//! Fixtures shared by the unit tests of several modules.
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::image::codec;
use crate::model::Image;

/// Encoded `width`x`height` image of a single colour
pub fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let pixels = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 40])));
    codec::encode(&pixels, format, None).expect("encode fixture")
}

pub fn png_blob(width: u32, height: u32) -> Vec<u8> {
    encoded(width, height, ImageFormat::Png)
}

pub fn jpeg_blob(width: u32, height: u32) -> Vec<u8> {
    encoded(width, height, ImageFormat::Jpeg)
}

/// A fully described PNG image owned by `user`
pub fn png_image(user: &str, image_identifier: &str, width: u32, height: u32) -> Image {
    let blob = png_blob(width, height);
    let mut image = Image::new();
    image
        .set_user(user)
        .set_image_identifier(image_identifier)
        .set_mime_type("image/png")
        .set_extension("png")
        .set_dimensions(width, height)
        .set_original_checksum(crate::model::image::checksum(&blob))
        .set_blob(blob);
    image
}
