//! # Server configuration
//!
//! [`ConfigData`] is a flat map of top-level keys to JSON values, loadable
//! from JSON, YAML or TOML files. Typed views over the well-known sections
//! ([`StorageConfig`], [`DatabaseConfig`], [`EventListenerConfig`]) are
//! deserialized on demand; unknown keys are kept so custom listeners can
//! read their own settings from the `config` event argument.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::event::listener::UserFilter;
use crate::kernel::constants::DEFAULT_STORAGE_DIR;
use crate::kernel::error::{Error, Result};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    /// Requires the `yaml-config` feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// Requires the `toml-config` feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// In-memory representation of the configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigData {
    #[serde(flatten)]
    values: Map<String, Value>,
}

impl ConfigData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            Value::Null => Ok(Self::new()),
            other => Err(Error::Config(format!("Configuration must be an object, got {}", other))),
        }
    }

    /// Typed value of `key`, `None` when absent or of the wrong shape
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn get_or<T: for<'de> Deserialize<'de>>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Raw value of `key`
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Like [`ConfigData::get`] but a present, malformed value is an error
    pub fn section<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<Option<T>> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| Error::Config(format!("Invalid \"{}\" section: {}", key, e))),
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| Error::Config(format!("Failed to serialize config value: {}", e)))?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    /// Merge with another config, overriding existing top-level keys
    pub fn merge(&mut self, other: &ConfigData) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    pub fn serialize(&self, format: ConfigFormat) -> Result<String> {
        match format {
            ConfigFormat::Json => serde_json::to_string_pretty(&self)
                .map_err(|e| Error::Config(format!("Failed to serialize to JSON: {}", e))),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(&self)
                .map_err(|e| Error::Config(format!("Failed to serialize to YAML: {}", e))),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(&self)
                .map_err(|e| Error::Config(format!("Failed to serialize to TOML: {}", e))),
        }
    }

    pub fn deserialize(data: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Json => serde_json::from_str(data)
                .map_err(|e| Error::Config(format!("Failed to deserialize from JSON: {}", e))),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data)
                .map_err(|e| Error::Config(format!("Failed to deserialize from YAML: {}", e))),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data)
                .map_err(|e| Error::Config(format!("Failed to deserialize from TOML: {}", e))),
        }
    }

    /// Read a configuration file, picking the format from its extension
    pub fn load(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| Error::Config(format!("Unsupported configuration format: {}", path.display())))?;
        let data = fs::read_to_string(path).map_err(|e| Error::io(e, "read configuration", path.to_path_buf()))?;
        Self::deserialize(&data, format)
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_DIR)
}

/// The `storage` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    Filesystem {
        #[serde(default = "default_storage_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Filesystem {
            path: default_storage_path(),
        }
    }
}

/// The `database` section
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfig {
    #[default]
    Memory,
}

/// One entry of the `eventListeners` section.
///
/// Without `events` the listener subscribes to its own default events.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventListenerConfig {
    /// Catalog identifier of the listener
    pub listener: String,
    #[serde(default)]
    pub params: Value,
    /// `event name -> definition`, in the shapes `CallbackSpec::from_value` accepts
    #[serde(default)]
    pub events: Option<Value>,
    #[serde(default)]
    pub users: Option<UserFilter>,
}

#[cfg(test)]
mod tests;
