use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::http::date::format_date;
use crate::http::formatter::{Formatter, shows_field};
use crate::kernel::error::{Error, Result};
use crate::model::{
    AccessRuleModel, AccessRulesModel, ArrayModel, ErrorModel, GroupModel, GroupsModel, Image,
    ImagesModel, MetadataModel, StatsModel, StatusModel, UserModel,
};

/// JSON rendering of the response models
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }

    fn encode<T: Serialize>(data: &T) -> Result<String> {
        serde_json::to_string(data).map_err(|e| Error::Other(format!("Failed to encode JSON: {}", e)))
    }

    fn image_entry(image: &Image, fields: &[String]) -> Value {
        let mut entry = Map::new();
        entry.insert("added".into(), image.added().map(|d| format_date(&d)).into());
        entry.insert("updated".into(), image.updated().map(|d| format_date(&d)).into());
        entry.insert("checksum".into(), image.checksum().into());
        entry.insert("originalChecksum".into(), image.original_checksum().into());
        entry.insert("extension".into(), image.extension().into());
        entry.insert("size".into(), image.filesize().into());
        entry.insert("width".into(), image.width().into());
        entry.insert("height".into(), image.height().into());
        entry.insert("mime".into(), image.mime_type().into());
        entry.insert("imageIdentifier".into(), image.image_identifier().into());
        entry.insert("user".into(), image.user().into());

        if shows_field(fields, "metadata") {
            entry.insert("metadata".into(), Value::Object(image.metadata().clone()));
        }

        if !fields.is_empty() {
            entry.retain(|key, _| shows_field(fields, key));
        }

        Value::Object(entry)
    }
}

impl Formatter for JsonFormatter {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn format_error(&self, model: &ErrorModel) -> Result<String> {
        let mut data = json!({
            "error": {
                "code": model.http_code,
                "message": model.error_message,
                "date": format_date(&model.date),
                "pictorErrorCode": model.error_code,
            }
        });

        if let Some(image_identifier) = &model.image_identifier {
            data["imageIdentifier"] = image_identifier.as_str().into();
        }

        Self::encode(&data)
    }

    fn format_status(&self, model: &StatusModel) -> Result<String> {
        Self::encode(&json!({
            "date": format_date(&model.date),
            "database": model.database,
            "storage": model.storage,
        }))
    }

    fn format_user(&self, model: &UserModel) -> Result<String> {
        Self::encode(&json!({
            "user": model.user_id,
            "numImages": model.num_images,
            "lastModified": format_date(&model.last_modified),
        }))
    }

    fn format_images(&self, model: &ImagesModel) -> Result<String> {
        let images: Vec<Value> = model
            .images
            .iter()
            .map(|image| Self::image_entry(image, &model.fields))
            .collect();

        Self::encode(&json!({
            "search": {
                "hits": model.hits,
                "page": model.page,
                "limit": model.limit,
                "count": model.count(),
            },
            "images": images,
        }))
    }

    fn format_metadata(&self, model: &MetadataModel) -> Result<String> {
        Self::encode(&model.data)
    }

    fn format_groups(&self, model: &GroupsModel) -> Result<String> {
        Self::encode(&json!({
            "search": {
                "hits": model.hits,
                "page": model.page,
                "limit": model.limit,
                "count": model.count(),
            },
            "groups": model.groups,
        }))
    }

    fn format_group(&self, model: &GroupModel) -> Result<String> {
        Self::encode(model)
    }

    fn format_access_rule(&self, model: &AccessRuleModel) -> Result<String> {
        Self::encode(model)
    }

    fn format_access_rules(&self, model: &AccessRulesModel) -> Result<String> {
        Self::encode(&model.rules)
    }

    fn format_array(&self, model: &ArrayModel) -> Result<String> {
        Self::encode(&model.data)
    }

    fn format_stats(&self, model: &StatsModel) -> Result<String> {
        Self::encode(&json!({
            "numImages": model.num_images,
            "numUsers": model.num_users,
            "numBytes": model.num_bytes,
            "custom": model.custom,
        }))
    }
}
