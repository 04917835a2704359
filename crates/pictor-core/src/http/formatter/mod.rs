//! Text formatters for response models.
pub mod json;
pub mod xml;

use crate::kernel::error::{Error, Result};
use crate::model::{
    AccessRuleModel, AccessRulesModel, ArrayModel, ErrorModel, GroupModel, GroupsModel, ImagesModel,
    MetadataModel, Model, StatsModel, StatusModel, UserModel,
};

pub use json::JsonFormatter;
pub use xml::XmlFormatter;

/// Renders models into one wire representation.
///
/// [`Formatter::format`] dispatches over the model kinds; image models have
/// no text form and are rejected.
pub trait Formatter: Send + Sync {
    /// Content type of the rendered output
    fn content_type(&self) -> &'static str;

    fn format(&self, model: &Model) -> Result<String> {
        match model {
            Model::Error(m) => self.format_error(m),
            Model::Status(m) => self.format_status(m),
            Model::User(m) => self.format_user(m),
            Model::Images(m) => self.format_images(m),
            Model::Metadata(m) => self.format_metadata(m),
            Model::Groups(m) => self.format_groups(m),
            Model::Group(m) => self.format_group(m),
            Model::AccessRule(m) => self.format_access_rule(m),
            Model::AccessRules(m) => self.format_access_rules(m),
            Model::Array(m) => self.format_array(m),
            Model::Stats(m) => self.format_stats(m),
            Model::Image(_) => Err(Error::InvalidArgument(format!(
                "Unsupported model type: {}",
                model.kind()
            ))),
        }
    }

    fn format_error(&self, model: &ErrorModel) -> Result<String>;
    fn format_status(&self, model: &StatusModel) -> Result<String>;
    fn format_user(&self, model: &UserModel) -> Result<String>;
    fn format_images(&self, model: &ImagesModel) -> Result<String>;
    fn format_metadata(&self, model: &MetadataModel) -> Result<String>;
    fn format_groups(&self, model: &GroupsModel) -> Result<String>;
    fn format_group(&self, model: &GroupModel) -> Result<String>;
    fn format_access_rule(&self, model: &AccessRuleModel) -> Result<String>;
    fn format_access_rules(&self, model: &AccessRulesModel) -> Result<String>;
    fn format_array(&self, model: &ArrayModel) -> Result<String>;
    fn format_stats(&self, model: &StatsModel) -> Result<String>;
}

/// Whether `field` should be shown given a field selection (empty shows all)
pub(crate) fn shows_field(fields: &[String], field: &str) -> bool {
    fields.is_empty() || fields.iter().any(|f| f == field)
}

#[cfg(test)]
mod tests;
