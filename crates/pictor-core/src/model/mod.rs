//! # Response models
//!
//! The closed set of payloads a response can carry. Formatters render every
//! kind except [`Model::Image`], whose bytes are sent as they are.
pub mod image;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::http::request::Request;
use crate::kernel::Shared;
use crate::kernel::error::Error;

pub use image::Image;

#[derive(Debug, Clone)]
pub enum Model {
    Error(ErrorModel),
    Status(StatusModel),
    User(UserModel),
    Images(ImagesModel),
    Metadata(MetadataModel),
    Groups(GroupsModel),
    Group(GroupModel),
    AccessRule(AccessRuleModel),
    AccessRules(AccessRulesModel),
    Array(ArrayModel),
    Stats(StatsModel),
    Image(Shared<Image>),
}

impl Model {
    /// Lower-case kind name, used to pick negotiation candidates
    pub fn kind(&self) -> &'static str {
        match self {
            Model::Error(_) => "error",
            Model::Status(_) => "status",
            Model::User(_) => "user",
            Model::Images(_) => "images",
            Model::Metadata(_) => "metadata",
            Model::Groups(_) => "groups",
            Model::Group(_) => "group",
            Model::AccessRule(_) => "accessrule",
            Model::AccessRules(_) => "accessrules",
            Model::Array(_) => "arraymodel",
            Model::Stats(_) => "stats",
            Model::Image(_) => "image",
        }
    }

    pub fn as_image(&self) -> Option<&Shared<Image>> {
        match self {
            Model::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Model::Error(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorModel {
    pub http_code: u16,
    pub error_message: String,
    pub date: DateTime<Utc>,
    pub error_code: u16,
    pub image_identifier: Option<String>,
}

impl ErrorModel {
    pub fn new(http_code: u16, error_message: impl Into<String>) -> Self {
        Self {
            http_code,
            error_message: error_message.into(),
            date: Utc::now(),
            error_code: 0,
            image_identifier: None,
        }
    }

    /// Build the model describing `error` for the request being served
    pub fn from_error(error: &Error, request: Option<&Request>) -> Self {
        Self {
            http_code: error.status_code(),
            error_message: error.message(),
            date: Utc::now(),
            error_code: error.error_code(),
            image_identifier: request.and_then(|r| r.image_identifier()).map(str::to_owned),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusModel {
    pub date: DateTime<Utc>,
    pub database: bool,
    pub storage: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserModel {
    pub user_id: String,
    pub num_images: usize,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImagesModel {
    pub images: Vec<Image>,
    /// Fields to display, everything when empty
    pub fields: Vec<String>,
    pub hits: usize,
    pub page: usize,
    pub limit: usize,
}

impl ImagesModel {
    pub fn count(&self) -> usize {
        self.images.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataModel {
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayModel {
    pub data: Map<String, Value>,
}

impl ArrayModel {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupModel {
    pub name: String,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupsModel {
    pub groups: Vec<GroupModel>,
    pub hits: usize,
    pub page: usize,
    pub limit: usize,
}

impl GroupsModel {
    pub fn count(&self) -> usize {
        self.groups.len()
    }
}

/// Users an access rule applies to: all of them (`"*"`) or a list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserScope {
    Any,
    Only(Vec<String>),
}

impl Default for UserScope {
    fn default() -> Self {
        UserScope::Only(Vec::new())
    }
}

impl UserScope {
    pub fn allows(&self, user: Option<&str>) -> bool {
        match (self, user) {
            (UserScope::Any, _) => true,
            (UserScope::Only(_), None) => true,
            (UserScope::Only(users), Some(user)) => users.iter().any(|u| u == user),
        }
    }
}

impl Serialize for UserScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            UserScope::Any => serializer.serialize_str("*"),
            UserScope::Only(users) => users.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for UserScope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Wildcard(String),
            List(Vec<String>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Wildcard(value) if value == "*" => Ok(UserScope::Any),
            Raw::Wildcard(value) => Err(serde::de::Error::custom(format!(
                "expected \"*\" or a list of users, got \"{}\"",
                value
            ))),
            Raw::List(users) => Ok(UserScope::Only(users)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessRuleModel {
    pub id: u64,
    pub users: UserScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessRulesModel {
    pub rules: Vec<AccessRuleModel>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsModel {
    pub num_images: usize,
    pub num_users: usize,
    pub num_bytes: usize,
    pub custom: Map<String, Value>,
}
