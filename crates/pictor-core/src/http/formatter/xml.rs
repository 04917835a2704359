use std::fmt::Write;

use serde_json::{Map, Value};

use crate::http::date::format_date;
use crate::http::formatter::{Formatter, shows_field};
use crate::kernel::error::Result;
use crate::model::{
    AccessRuleModel, AccessRulesModel, ArrayModel, ErrorModel, GroupModel, GroupsModel, ImagesModel,
    MetadataModel, StatsModel, StatusModel, UserModel, UserScope,
};

const ROOT: &str = "pictor";

/// Characters XML 1.0 allows in a document
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Escape markup and drop characters no XML parser would accept
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars().filter(|c| is_xml_char(*c)) {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Minimal string builder for the documents below
#[derive(Default)]
struct XmlWriter {
    out: String,
}

impl XmlWriter {
    fn document(body: impl FnOnce(&mut XmlWriter)) -> String {
        let mut writer = XmlWriter::default();
        writer.out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        writer.element(ROOT, body);
        writer.out
    }

    fn element(&mut self, name: &str, body: impl FnOnce(&mut XmlWriter)) {
        let _ = write!(self.out, "<{}>", name);
        body(self);
        let _ = write!(self.out, "</{}>", name);
    }

    fn text<T: ToString>(&mut self, name: &str, value: T) {
        let _ = write!(self.out, "<{}>{}</{}>", name, escape(&value.to_string()), name);
    }

    fn flag(&mut self, name: &str, value: bool) {
        self.text(name, if value { 1 } else { 0 });
    }

    /// Arbitrary JSON data. Keys that are not valid element names become `<value key="..">`.
    fn value(&mut self, name: &str, value: &Value) {
        match value {
            Value::Object(map) => self.element(name, |w| w.map(map)),
            Value::Array(items) => self.element(name, |w| {
                for item in items {
                    w.value("item", item);
                }
            }),
            Value::Null => {
                let _ = write!(self.out, "<{}/>", name);
            }
            Value::Bool(flag) => self.flag(name, *flag),
            Value::String(text) => self.text(name, text),
            Value::Number(number) => self.text(name, number),
        }
    }

    fn map(&mut self, map: &Map<String, Value>) {
        for (key, value) in map {
            if Self::is_element_name(key) {
                self.value(key, value);
            } else {
                let _ = write!(self.out, "<value key=\"{}\">", escape(key));
                self.inline(value);
                self.out.push_str("</value>");
            }
        }
    }

    fn inline(&mut self, value: &Value) {
        match value {
            Value::String(text) => self.out.push_str(&escape(text)),
            Value::Object(map) => self.map(map),
            other => self.out.push_str(&escape(&other.to_string())),
        }
    }

    /// Metadata style `<tag key="..">value</tag>` list
    fn tags(&mut self, map: &Map<String, Value>) {
        for (key, value) in map {
            let _ = write!(self.out, "<tag key=\"{}\">", escape(key));
            self.inline(value);
            self.out.push_str("</tag>");
        }
    }

    fn search(&mut self, hits: usize, page: usize, limit: usize, count: usize) {
        self.element("search", |w| {
            w.text("hits", hits);
            w.text("page", page);
            w.text("limit", limit);
            w.text("count", count);
        });
    }

    fn list(&mut self, outer: &str, inner: &str, items: &[String]) {
        self.element(outer, |w| {
            for item in items {
                w.text(inner, item);
            }
        });
    }

    fn is_element_name(name: &str) -> bool {
        let mut chars = name.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !name.to_ascii_lowercase().starts_with("xml")
    }
}

/// XML rendering of the response models
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlFormatter;

impl XmlFormatter {
    pub fn new() -> Self {
        Self
    }

    fn access_rule(w: &mut XmlWriter, rule: &AccessRuleModel) {
        w.element("rule", |w| {
            w.text("id", rule.id);
            match &rule.users {
                UserScope::Any => w.text("users", "*"),
                UserScope::Only(users) => w.list("users", "user", users),
            }
            if let Some(group) = &rule.group {
                w.text("group", group);
            }
            if !rule.resources.is_empty() {
                w.list("resources", "resource", &rule.resources);
            }
        });
    }

    fn group(w: &mut XmlWriter, group: &GroupModel) {
        w.element("group", |w| {
            w.text("name", &group.name);
            w.list("resources", "resource", &group.resources);
        });
    }
}

impl Formatter for XmlFormatter {
    fn content_type(&self) -> &'static str {
        "application/xml"
    }

    fn format_error(&self, model: &ErrorModel) -> Result<String> {
        Ok(XmlWriter::document(|w| {
            w.element("error", |w| {
                w.text("code", model.http_code);
                w.text("message", &model.error_message);
                w.text("date", format_date(&model.date));
                w.text("pictorErrorCode", model.error_code);
            });
            if let Some(image_identifier) = &model.image_identifier {
                w.text("imageIdentifier", image_identifier);
            }
        }))
    }

    fn format_status(&self, model: &StatusModel) -> Result<String> {
        Ok(XmlWriter::document(|w| {
            w.element("status", |w| {
                w.text("date", format_date(&model.date));
                w.flag("database", model.database);
                w.flag("storage", model.storage);
            });
        }))
    }

    fn format_user(&self, model: &UserModel) -> Result<String> {
        Ok(XmlWriter::document(|w| {
            w.element("user", |w| {
                w.text("user", &model.user_id);
                w.text("numImages", model.num_images);
                w.text("lastModified", format_date(&model.last_modified));
            });
        }))
    }

    fn format_images(&self, model: &ImagesModel) -> Result<String> {
        let fields = &model.fields;
        Ok(XmlWriter::document(|w| {
            w.search(model.hits, model.page, model.limit, model.count());
            w.element("images", |w| {
                for image in &model.images {
                    w.element("image", |w| {
                        let date = |d: Option<chrono::DateTime<chrono::Utc>>| d.map(|d| format_date(&d)).unwrap_or_default();
                        let scalars: [(&str, String); 11] = [
                            ("added", date(image.added())),
                            ("updated", date(image.updated())),
                            ("checksum", image.checksum().to_string()),
                            ("originalChecksum", image.original_checksum().to_string()),
                            ("extension", image.extension().to_string()),
                            ("size", image.filesize().to_string()),
                            ("width", image.width().to_string()),
                            ("height", image.height().to_string()),
                            ("mime", image.mime_type().to_string()),
                            ("imageIdentifier", image.image_identifier().to_string()),
                            ("user", image.user().to_string()),
                        ];
                        for (name, value) in scalars {
                            if shows_field(fields, name) {
                                w.text(name, value);
                            }
                        }
                        if shows_field(fields, "metadata") {
                            w.element("metadata", |w| w.tags(image.metadata()));
                        }
                    });
                }
            });
        }))
    }

    fn format_metadata(&self, model: &MetadataModel) -> Result<String> {
        Ok(XmlWriter::document(|w| {
            w.element("metadata", |w| w.tags(&model.data));
        }))
    }

    fn format_groups(&self, model: &GroupsModel) -> Result<String> {
        Ok(XmlWriter::document(|w| {
            w.search(model.hits, model.page, model.limit, model.count());
            w.element("groups", |w| {
                for group in &model.groups {
                    Self::group(w, group);
                }
            });
        }))
    }

    fn format_group(&self, model: &GroupModel) -> Result<String> {
        Ok(XmlWriter::document(|w| Self::group(w, model)))
    }

    fn format_access_rule(&self, model: &AccessRuleModel) -> Result<String> {
        Ok(XmlWriter::document(|w| Self::access_rule(w, model)))
    }

    fn format_access_rules(&self, model: &AccessRulesModel) -> Result<String> {
        Ok(XmlWriter::document(|w| {
            w.element("access", |w| {
                for rule in &model.rules {
                    Self::access_rule(w, rule);
                }
            });
        }))
    }

    fn format_array(&self, model: &ArrayModel) -> Result<String> {
        Ok(XmlWriter::document(|w| w.map(&model.data)))
    }

    fn format_stats(&self, model: &StatsModel) -> Result<String> {
        Ok(XmlWriter::document(|w| {
            w.element("stats", |w| {
                w.text("numImages", model.num_images);
                w.text("numUsers", model.num_users);
                w.text("numBytes", model.num_bytes);
                w.element("custom", |w| w.map(&model.custom));
            });
        }))
    }
}
