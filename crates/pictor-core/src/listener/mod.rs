//! Built-in pipeline listeners that bridge events to the adapters.
//!
//! Resources never talk to the database or the storage directly; they
//! trigger `db.*` and `storage.*` events which the listeners here turn into
//! adapter calls. Replacing one of these listeners changes how an operation
//! is carried out without touching the resources.
pub mod access_control;
pub mod database_operations;
pub mod storage_operations;

use crate::event::Event;
use crate::http::request::Request;
use crate::kernel::error::{Error, Result};
use crate::kernel::lock;

pub use access_control::AccessControlListener;
pub use database_operations::DatabaseOperations;
pub use storage_operations::StorageOperations;

/// Event argument carrying the image being inserted (`Shared<Image>`)
pub const ARG_IMAGE: &str = "image";

/// Event argument carrying metadata to store (`serde_json::Map`)
pub const ARG_METADATA: &str = "metadata";

/// User of the current route
pub(crate) fn route_user(event: &Event) -> Result<String> {
    let request = event.request()?;
    let request = lock(&request, "request")?;
    request
        .user()
        .map(str::to_owned)
        .ok_or_else(|| Error::bad_request("Missing user"))
}

/// User and image identifier of the current route
pub(crate) fn route_image(event: &Event) -> Result<(String, String)> {
    let request = event.request()?;
    let request = lock(&request, "request")?;
    match (request.user(), request.image_identifier()) {
        (Some(user), Some(image_identifier)) => Ok((user.to_string(), image_identifier.to_string())),
        _ => Err(Error::bad_request("Missing user or image identifier")),
    }
}

/// Positive integer query parameter, `default` when absent
pub(crate) fn positive_param(request: &Request, name: &str, default: usize) -> Result<usize> {
    match request.query_param(name) {
        None => Ok(default),
        Some(raw) => match raw.parse::<usize>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(Error::bad_request(format!("Invalid value for {}: {}", name, raw))),
        },
    }
}

#[cfg(test)]
mod tests;
