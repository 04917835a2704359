use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::tempdir;

use crate::config::{ConfigData, ConfigFormat, DatabaseConfig, EventListenerConfig, StorageConfig};
use crate::kernel::error::{Error, Result};

fn sample() -> Result<ConfigData> {
    ConfigData::from_value(json!({
        "contentNegotiateImages": false,
        "storage": {"type": "filesystem", "path": "/var/lib/pictor"},
        "custom": {"answer": 42}
    }))
}

#[test]
fn test_typed_access() -> Result<()> {
    let config = sample()?;

    assert_eq!(config.get::<bool>("contentNegotiateImages"), Some(false));
    assert_eq!(config.get::<bool>("custom"), None);
    assert!(config.get_or("missing", true));
    assert_eq!(config.value("custom"), Some(&json!({"answer": 42})));
    assert!(config.contains_key("storage"));
    assert_eq!(config.keys(), vec!["contentNegotiateImages", "storage", "custom"]);
    Ok(())
}

#[test]
fn test_only_objects_are_configurations() {
    assert!(ConfigData::from_value(Value::Null).is_ok_and(|config| config.keys().is_empty()));
    assert!(matches!(ConfigData::from_value(json!([1, 2])), Err(Error::Config(_))));
}

#[test]
fn test_sections() -> Result<()> {
    let config = sample()?;

    assert_eq!(
        config.section::<StorageConfig>("storage")?,
        Some(StorageConfig::Filesystem {
            path: PathBuf::from("/var/lib/pictor")
        })
    );
    assert_eq!(config.section::<DatabaseConfig>("database")?, None);

    let mut broken = sample()?;
    broken.set("storage", json!({"type": "s3"}))?;
    assert!(matches!(broken.section::<StorageConfig>("storage"), Err(Error::Config(_))));
    Ok(())
}

#[test]
fn test_section_defaults() -> Result<()> {
    let config = ConfigData::from_value(json!({
        "storage": {"type": "filesystem"},
        "database": {"type": "memory"}
    }))?;

    assert_eq!(config.section::<StorageConfig>("storage")?, Some(StorageConfig::default()));
    assert_eq!(config.section::<DatabaseConfig>("database")?, Some(DatabaseConfig::Memory));
    Ok(())
}

#[test]
fn test_event_listener_definitions() -> Result<()> {
    let definition: EventListenerConfig = serde_json::from_value(json!({
        "listener": "access-token",
        "events": {"image.get": 100},
        "users": {"whitelist": ["christer"]}
    }))
    .map_err(|e| Error::Config(e.to_string()))?;

    assert_eq!(definition.listener, "access-token");
    assert_eq!(definition.params, Value::Null);
    assert_eq!(definition.events, Some(json!({"image.get": 100})));
    assert!(definition.users.is_some());
    Ok(())
}

#[test]
fn test_merge_overrides_top_level_keys() -> Result<()> {
    let mut config = sample()?;
    let overrides = ConfigData::from_value(json!({"custom": {"other": 1}, "extra": true}))?;
    config.merge(&overrides);

    assert_eq!(config.value("custom"), Some(&json!({"other": 1})));
    assert_eq!(config.get::<bool>("extra"), Some(true));
    assert_eq!(config.remove("extra"), Some(json!(true)));
    assert!(!config.contains_key("extra"));
    Ok(())
}

#[test]
fn test_json_serialization() -> Result<()> {
    let config = sample()?;
    let text = config.serialize(ConfigFormat::Json)?;
    assert_eq!(ConfigData::deserialize(&text, ConfigFormat::Json)?, config);
    assert!(ConfigData::deserialize("{", ConfigFormat::Json).is_err());
    Ok(())
}

#[test]
fn test_load_from_file() -> Result<()> {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("pictor.json");
    fs::write(&path, r#"{"contentNegotiateImages": true}"#).expect("write config");

    let config = ConfigData::load(&path)?;
    assert_eq!(config.get::<bool>("contentNegotiateImages"), Some(true));

    assert!(matches!(
        ConfigData::load(&dir.path().join("missing.json")),
        Err(Error::StorageSystem(_))
    ));
    assert!(matches!(ConfigData::load(Path::new("pictor.ini")), Err(Error::Config(_))));
    Ok(())
}

#[test]
fn test_format_from_path() {
    assert_eq!(ConfigFormat::from_path(Path::new("a/b.JSON")), Some(ConfigFormat::Json));
    assert_eq!(ConfigFormat::from_path(Path::new("noext")), None);
    assert_eq!(ConfigFormat::Json.extension(), "json");
}

#[cfg(feature = "yaml-config")]
#[test]
fn test_yaml_configuration() -> Result<()> {
    let config = ConfigData::deserialize("storage:\n  type: filesystem\n  path: /tmp/x\n", ConfigFormat::Yaml)?;
    assert_eq!(
        config.section::<StorageConfig>("storage")?,
        Some(StorageConfig::Filesystem {
            path: PathBuf::from("/tmp/x")
        })
    );
    Ok(())
}

#[cfg(feature = "toml-config")]
#[test]
fn test_toml_configuration() -> Result<()> {
    let config = ConfigData::deserialize("contentNegotiateImages = false\n", ConfigFormat::Toml)?;
    assert_eq!(config.get::<bool>("contentNegotiateImages"), Some(false));
    Ok(())
}
