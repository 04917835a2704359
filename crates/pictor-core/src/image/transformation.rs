//! # Image transformations
//!
//! The [`TransformationManager`] listens on `image.transform`, reads the
//! transformations requested through the `t` query parameter and applies them
//! in order to the image held by the response.
//!
//! A transformation works on decoded pixels. The manager decodes the image
//! once, runs the chain and re-encodes the result in the image's own format;
//! conversions to other formats happen later, when the response is formatted.
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use image::DynamicImage;
use image::imageops::FilterType;
use log::debug;
use serde_json::Value;

use crate::event::error::EventSystemError;
use crate::event::listener::{CallbackSpec, Listener, ListenerDefinition, Subscriptions};
use crate::event::{ARG_INPUT_LOADER_MANAGER, Event};
use crate::image::codec;
use crate::kernel::constants::{MAX_TRANSFORMATION_DIMENSION, error_codes};
use crate::kernel::error::{Error, Result};
use crate::kernel::lock;
use crate::model::{Image, Model};

/// A single named image operation.
pub trait Transformation: Send + Sync {
    /// Apply to `pixels`. `image` may be adjusted for side effects such as the
    /// output quality.
    fn apply(&self, pixels: DynamicImage, image: &mut Image, params: &HashMap<String, String>) -> Result<DynamicImage>;
}

fn transformation_error(message: impl Into<String>) -> Error {
    Error::http_with_code(400, message, error_codes::IMAGE_TRANSFORMATION_ERROR)
}

fn numeric_param(params: &HashMap<String, String>, name: &str) -> Result<Option<u32>> {
    match params.get(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| transformation_error(format!("Invalid value for '{}': {}", name, raw))),
    }
}

/// `rotate:angle=90|180|270`
#[derive(Debug, Clone, Copy, Default)]
pub struct Rotate;

impl Transformation for Rotate {
    fn apply(&self, pixels: DynamicImage, _image: &mut Image, params: &HashMap<String, String>) -> Result<DynamicImage> {
        match numeric_param(params, "angle")? {
            Some(90) => Ok(pixels.rotate90()),
            Some(180) => Ok(pixels.rotate180()),
            Some(270) => Ok(pixels.rotate270()),
            Some(other) => Err(transformation_error(format!("Unsupported rotation angle: {}", other))),
            None => Err(transformation_error("Missing required parameter: angle")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FlipHorizontally;

impl Transformation for FlipHorizontally {
    fn apply(&self, pixels: DynamicImage, _image: &mut Image, _params: &HashMap<String, String>) -> Result<DynamicImage> {
        Ok(pixels.fliph())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FlipVertically;

impl Transformation for FlipVertically {
    fn apply(&self, pixels: DynamicImage, _image: &mut Image, _params: &HashMap<String, String>) -> Result<DynamicImage> {
        Ok(pixels.flipv())
    }
}

/// `resize:width=..,height=..`; a missing side keeps the aspect ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resize;

impl Transformation for Resize {
    fn apply(&self, pixels: DynamicImage, _image: &mut Image, params: &HashMap<String, String>) -> Result<DynamicImage> {
        let width = numeric_param(params, "width")?;
        let height = numeric_param(params, "height")?;
        let (current_width, current_height) = (pixels.width().max(1), pixels.height().max(1));

        let (width, height) = match (width, height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, scale(current_height, w, current_width)?),
            (None, Some(h)) => (scale(current_width, h, current_height)?, h),
            (None, None) => {
                return Err(transformation_error("Missing both width and height. You need to specify at least one of them"));
            }
        };

        if width == 0 || height == 0 {
            return Err(transformation_error("Width and height must be positive"));
        }
        if width > MAX_TRANSFORMATION_DIMENSION || height > MAX_TRANSFORMATION_DIMENSION {
            return Err(transformation_error(format!(
                "Resized image would be {}x{}, the limit is {} pixels per side",
                width, height, MAX_TRANSFORMATION_DIMENSION
            )));
        }

        Ok(pixels.resize_exact(width, height, FilterType::Lanczos3))
    }
}

pub(crate) fn scale(side: u32, target: u32, reference: u32) -> Result<u32> {
    let scaled = ((u64::from(side) * u64::from(target)) / u64::from(reference)).max(1);
    u32::try_from(scaled).map_err(|_| transformation_error(format!("Scaled side {} is out of range", scaled)))
}

/// `compress:level=1..100`, applied when the image is encoded
#[derive(Debug, Clone, Copy, Default)]
pub struct Compress;

impl Transformation for Compress {
    fn apply(&self, pixels: DynamicImage, image: &mut Image, params: &HashMap<String, String>) -> Result<DynamicImage> {
        match numeric_param(params, "level")? {
            Some(level) if (1..=100).contains(&level) => {
                image.set_output_quality(Some(level as u8));
                Ok(pixels)
            }
            Some(level) => Err(transformation_error(format!("level must be between 1 and 100, got {}", level))),
            None => Err(transformation_error("Missing required parameter: level")),
        }
    }
}

/// Registry of named transformations and the `image.transform` listener.
#[derive(Clone)]
pub struct TransformationManager {
    transformations: HashMap<String, Arc<dyn Transformation>>,
    applied: bool,
}

impl fmt::Debug for TransformationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.transformations.keys().collect();
        names.sort();
        f.debug_struct("TransformationManager")
            .field("transformations", &names)
            .field("applied", &self.applied)
            .finish()
    }
}

impl Default for TransformationManager {
    fn default() -> Self {
        let mut manager = Self::empty();
        manager
            .add_transformation("rotate", Arc::new(Rotate))
            .add_transformation("flipHorizontally", Arc::new(FlipHorizontally))
            .add_transformation("flipVertically", Arc::new(FlipVertically))
            .add_transformation("resize", Arc::new(Resize))
            .add_transformation("compress", Arc::new(Compress));
        manager
    }
}

impl TransformationManager {
    /// Manager with the built-in transformations
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager without any transformation registered
    pub fn empty() -> Self {
        Self {
            transformations: HashMap::new(),
            applied: false,
        }
    }

    pub fn add_transformation(&mut self, name: impl Into<String>, transformation: Arc<dyn Transformation>) -> &mut Self {
        self.transformations.insert(name.into(), transformation);
        self
    }

    pub fn get_transformation(&self, name: &str) -> Option<Arc<dyn Transformation>> {
        self.transformations.get(name).cloned()
    }

    pub fn has_applied_transformations(&self) -> bool {
        self.applied
    }

    /// Apply the request's transformations to the image on the response
    pub fn apply_transformations(&mut self, event: &mut Event) -> Result<()> {
        let requested = lock(&*event.request()?, "request")?.transformations();
        if requested.is_empty() {
            return Ok(());
        }

        let image = {
            let response = event.response()?;
            let response = lock(&response, "response")?;
            match response.model() {
                Some(Model::Image(image)) => image.clone(),
                _ => return Ok(()),
            }
        };

        // Resolve every name before touching the image
        let mut chain = Vec::with_capacity(requested.len());
        for transformation in &requested {
            let handler = self.get_transformation(&transformation.name).ok_or_else(|| {
                transformation_error(format!("Transformation \"{}\" does not exist", transformation.name))
            })?;
            chain.push((handler, &transformation.params));
        }

        let mut image = lock(&image, "image")?;
        let format = codec::format_for_mime_type(image.mime_type()).ok_or_else(|| {
            Error::http_with_code(
                415,
                format!("Unsupported image type: {}", image.mime_type()),
                error_codes::IMAGE_UNSUPPORTED_MIMETYPE,
            )
        })?;

        let mut pixels = if event.has_argument(ARG_INPUT_LOADER_MANAGER) {
            event
                .input_loader_manager()?
                .load(image.mime_type(), image.blob())?
                .ok_or_else(|| Error::http_with_code(415, "Failed to load image", error_codes::IMAGE_BROKEN_IMAGE))?
        } else {
            codec::decode(image.blob(), format)?
        };

        for (handler, params) in chain {
            pixels = handler.apply(pixels, &mut image, params)?;
        }

        let blob = codec::encode(&pixels, format, image.output_quality())?;
        image
            .set_blob(blob)
            .set_dimensions(pixels.width(), pixels.height())
            .set_has_been_transformed(true);

        debug!(
            "Applied {} transformation(s) to image '{}'",
            requested.len(),
            image.image_identifier()
        );
        self.applied = true;
        Ok(())
    }
}

impl Listener for TransformationManager {
    fn handle(&mut self, method: &str, event: &mut Event) -> Result<()> {
        match method {
            "applyTransformations" => self.apply_transformations(event),
            other => Err(EventSystemError::UnknownMethod {
                handler: Self::IDENTIFIER.to_string(),
                method: other.to_string(),
            }
            .into()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ListenerDefinition for TransformationManager {
    const IDENTIFIER: &'static str = "transformation-manager";

    fn subscribed_events() -> Subscriptions {
        vec![("image.transform".to_string(), CallbackSpec::method("applyTransformations"))]
    }

    fn from_params(_params: &Value) -> Result<Self> {
        Ok(Self::new())
    }
}
