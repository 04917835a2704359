//! # Resources
//!
//! Every route is served by a resource listener subscribed to
//! `<route>.<method>` events. Resources put a model on the response and leave
//! the rendering to the response formatter; data access goes through the
//! `db.*` and `storage.*` events.
//!
//! | Route | Events |
//! |-------|--------|
//! | `status` | `status.get`, `status.head` |
//! | `stats` | `stats.get`, `stats.head` |
//! | `user` | `user.get`, `user.head` |
//! | `images` | `images.get`, `images.head`, `images.post` |
//! | `image` | `image.get`, `image.head`, `image.delete` |
//! | `metadata` | `metadata.get`, `metadata.head`, `metadata.put`, `metadata.post`, `metadata.delete` |
//! | `groups` | `groups.get`, `groups.head` |
//! | `group` | `group.get`, `group.head` |
//! | `accessrules` | `accessrules.get`, `accessrules.head` |
//! | `accessrule` | `accessrule.get`, `accessrule.head` |
pub mod access_rules;
pub mod groups;
pub mod image;
pub mod images;
pub mod metadata;
pub mod stats;
pub mod status;
pub mod user;

use crate::event::error::EventSystemError;
use crate::kernel::error::Error;

pub use access_rules::{AccessRuleResource, AccessRulesResource};
pub use groups::{GroupResource, GroupsResource};
pub use image::ImageResource;
pub use images::ImagesResource;
pub use metadata::MetadataResource;
pub use stats::StatsResource;
pub use status::StatusResource;
pub use user::UserResource;

/// Resources a read-only public key is typically granted
pub const READ_ONLY_RESOURCES: [&str; 8] = [
    "user.get",
    "user.head",
    "image.get",
    "image.head",
    "images.get",
    "images.head",
    "metadata.get",
    "metadata.head",
];

/// Resources a read+write key gets on top of the read-only ones
pub const WRITE_RESOURCES: [&str; 5] = [
    "image.delete",
    "images.post",
    "metadata.post",
    "metadata.put",
    "metadata.delete",
];

/// Resources describing access control itself
pub const ACCESS_CONTROL_RESOURCES: [&str; 8] = [
    "groups.get",
    "groups.head",
    "group.get",
    "group.head",
    "accessrules.get",
    "accessrules.head",
    "accessrule.get",
    "accessrule.head",
];

/// Every resource guarded by access control. `status` and `stats` are open.
pub fn all_resources() -> Vec<&'static str> {
    READ_ONLY_RESOURCES
        .iter()
        .chain(WRITE_RESOURCES.iter())
        .chain(ACCESS_CONTROL_RESOURCES.iter())
        .copied()
        .collect()
}

pub(crate) fn unknown_method(handler: &str, method: &str) -> Error {
    EventSystemError::UnknownMethod {
        handler: handler.to_string(),
        method: method.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests;
