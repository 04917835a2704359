use chrono::{TimeZone, Utc};
use serde_json::{Map, json};

use crate::http::formatter::{Formatter, XmlFormatter};
use crate::kernel::error::Result;
use crate::model::{AccessRuleModel, AccessRulesModel, ArrayModel, MetadataModel, Model, StatsModel, UserModel, UserScope};

const PROLOG: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

#[test]
fn test_user_model() -> Result<()> {
    let model = UserModel {
        user_id: "christer".to_string(),
        num_images: 3,
        last_modified: Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
    };
    let output = XmlFormatter::new().format(&Model::User(model))?;
    assert_eq!(
        output,
        format!(
            "{}<pictor><user><user>christer</user><numImages>3</numImages><lastModified>Mon, 15 Jan 2024 10:30:00 GMT</lastModified></user></pictor>",
            PROLOG
        )
    );
    assert_eq!(XmlFormatter::new().content_type(), "application/xml");
    Ok(())
}

#[test]
fn test_metadata_is_escaped() -> Result<()> {
    let mut data = Map::new();
    data.insert("title".to_string(), json!("Fish & <Chips>"));

    let output = XmlFormatter::new().format(&Model::Metadata(MetadataModel { data }))?;
    assert!(output.contains(r#"<metadata><tag key="title">Fish &amp; &lt;Chips&gt;</tag></metadata>"#));
    Ok(())
}

#[test]
fn test_control_characters_are_dropped() -> Result<()> {
    let mut data = Map::new();
    data.insert("no\u{1}te".to_string(), json!("bell\u{7} tab\t nul\u{0} end\u{FFFE}"));

    let output = XmlFormatter::new().format(&Model::Metadata(MetadataModel { data }))?;
    assert!(output.contains("<tag key=\"note\">bell tab\t nul end</tag>"));
    assert!(!output.chars().any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r')));
    Ok(())
}

#[test]
fn test_array_model_with_odd_keys() -> Result<()> {
    let mut data = Map::new();
    data.insert("imageIdentifier".to_string(), json!("abc"));
    data.insert("1st".to_string(), json!(true));

    let output = XmlFormatter::new().format(&Model::Array(ArrayModel::new(data)))?;
    assert!(output.ends_with(r#"<pictor><imageIdentifier>abc</imageIdentifier><value key="1st">true</value></pictor>"#));
    Ok(())
}

#[test]
fn test_access_rules() -> Result<()> {
    let model = AccessRulesModel {
        rules: vec![AccessRuleModel {
            id: 2,
            users: UserScope::Only(vec!["a".to_string(), "b".to_string()]),
            group: None,
            resources: vec!["image.get".to_string()],
        }],
    };
    let output = XmlFormatter::new().format(&Model::AccessRules(model))?;
    assert!(output.contains(
        "<access><rule><id>2</id><users><user>a</user><user>b</user></users><resources><resource>image.get</resource></resources></rule></access>"
    ));
    Ok(())
}

#[test]
fn test_stats_flags_and_custom() -> Result<()> {
    let mut custom = Map::new();
    custom.insert("uptime".to_string(), json!(12));
    let model = StatsModel {
        num_images: 1,
        num_users: 2,
        num_bytes: 3,
        custom,
    };
    let output = XmlFormatter::new().format(&Model::Stats(model))?;
    assert!(output.contains("<stats><numImages>1</numImages><numUsers>2</numUsers><numBytes>3</numBytes><custom><uptime>12</uptime></custom></stats>"));
    Ok(())
}
