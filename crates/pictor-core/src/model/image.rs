use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Known aliases and the mime type they stand for
const MIME_ALIASES: [(&str, &str); 4] = [
    ("image/jpg", "image/jpeg"),
    ("image/pjpeg", "image/jpeg"),
    ("image/x-png", "image/png"),
    ("image/x-webp", "image/webp"),
];

/// SHA-256 hex digest of a blob
pub fn checksum(blob: &[u8]) -> String {
    hex::encode(Sha256::digest(blob))
}

/// Map mime aliases onto their canonical form
pub fn normalize_mime_type(mime_type: &str) -> String {
    let lower = mime_type.to_ascii_lowercase();
    MIME_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(lower)
}

/// An image, with its bytes and everything known about it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    user: String,
    image_identifier: String,
    blob: Vec<u8>,
    mime_type: String,
    extension: String,
    width: u32,
    height: u32,
    filesize: usize,
    checksum: String,
    original_checksum: String,
    metadata: Map<String, Value>,
    added: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
    has_been_transformed: bool,
    output_quality: Option<u8>,
}

impl Image {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn set_user(&mut self, user: impl Into<String>) -> &mut Self {
        self.user = user.into();
        self
    }

    pub fn image_identifier(&self) -> &str {
        &self.image_identifier
    }

    pub fn set_image_identifier(&mut self, image_identifier: impl Into<String>) -> &mut Self {
        self.image_identifier = image_identifier.into();
        self
    }

    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Replace the bytes; size and checksum follow
    pub fn set_blob(&mut self, blob: Vec<u8>) -> &mut Self {
        self.filesize = blob.len();
        self.checksum = checksum(&blob);
        self.blob = blob;
        self
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn set_mime_type(&mut self, mime_type: &str) -> &mut Self {
        self.mime_type = normalize_mime_type(mime_type);
        self
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn set_extension(&mut self, extension: impl Into<String>) -> &mut Self {
        self.extension = extension.into();
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set_dimensions(&mut self, width: u32, height: u32) -> &mut Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn filesize(&self) -> usize {
        self.filesize
    }

    /// Set the size without touching the blob, for images loaded from the database
    pub fn set_filesize(&mut self, filesize: usize) -> &mut Self {
        self.filesize = filesize;
        self
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn set_checksum(&mut self, checksum: impl Into<String>) -> &mut Self {
        self.checksum = checksum.into();
        self
    }

    pub fn original_checksum(&self) -> &str {
        &self.original_checksum
    }

    pub fn set_original_checksum(&mut self, checksum: impl Into<String>) -> &mut Self {
        self.original_checksum = checksum.into();
        self
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn set_metadata(&mut self, metadata: Map<String, Value>) -> &mut Self {
        self.metadata = metadata;
        self
    }

    pub fn added(&self) -> Option<DateTime<Utc>> {
        self.added
    }

    pub fn set_added(&mut self, date: DateTime<Utc>) -> &mut Self {
        self.added = Some(date);
        self
    }

    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated
    }

    pub fn set_updated(&mut self, date: DateTime<Utc>) -> &mut Self {
        self.updated = Some(date);
        self
    }

    pub fn has_been_transformed(&self) -> bool {
        self.has_been_transformed
    }

    pub fn set_has_been_transformed(&mut self, transformed: bool) -> &mut Self {
        self.has_been_transformed = transformed;
        self
    }

    /// Encoder quality requested by the client (1-100)
    pub fn output_quality(&self) -> Option<u8> {
        self.output_quality
    }

    pub fn set_output_quality(&mut self, quality: Option<u8>) -> &mut Self {
        self.output_quality = quality;
        self
    }

    /// Copy without the bytes, as stored in the database
    pub fn without_blob(&self) -> Self {
        Self {
            blob: Vec::new(),
            ..self.clone()
        }
    }
}
