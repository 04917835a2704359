use serde::Deserialize;
use serde_json::{Map, Value};

use crate::auth::error::AccessControlError;
use crate::auth::{AccessControl, GroupsPage};
use crate::kernel::error::Result;
use crate::model::{AccessRuleModel, GroupModel, UserScope};

/// A single rule as written in the configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AclRule {
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub users: Option<UserScope>,
}

/// Rules for one public key
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListEntry {
    pub public_key: String,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub acl: Vec<AclRule>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawConfig {
    List(Vec<AccessListEntry>),
    Full {
        #[serde(rename = "accessList", default)]
        access_list: Vec<AccessListEntry>,
        #[serde(default)]
        groups: Map<String, Value>,
    },
}

/// Read-only access control backed by configuration.
#[derive(Debug, Clone, Default)]
pub struct ArrayAdapter {
    access_list: Vec<AccessListEntry>,
    groups: Vec<GroupModel>,
}

impl ArrayAdapter {
    /// Build from an access list and named resource groups.
    ///
    /// Fails when a public key is declared more than once.
    pub fn new(access_list: Vec<AccessListEntry>, groups: Vec<GroupModel>) -> Result<Self> {
        let mut seen: Vec<&str> = Vec::with_capacity(access_list.len());
        for entry in &access_list {
            if seen.contains(&entry.public_key.as_str()) {
                return Err(AccessControlError::DuplicatePublicKey(entry.public_key.clone()).into());
            }
            seen.push(&entry.public_key);
        }

        Ok(Self { access_list, groups })
    }

    /// Build from the `accessControl` configuration value: either a bare
    /// access list or `{ "accessList": [..], "groups": { name: [resources] } }`.
    pub fn from_value(value: &Value) -> Result<Self> {
        let raw: RawConfig = serde_json::from_value(value.clone())
            .map_err(|e| AccessControlError::InvalidConfiguration(e.to_string()))?;

        let (access_list, groups) = match raw {
            RawConfig::List(access_list) => (access_list, Map::new()),
            RawConfig::Full { access_list, groups } => (access_list, groups),
        };

        let mut parsed_groups = Vec::with_capacity(groups.len());
        for (name, resources) in groups {
            let resources: Vec<String> = serde_json::from_value(resources).map_err(|e| {
                AccessControlError::InvalidConfiguration(format!("group '{}': {}", name, e))
            })?;
            parsed_groups.push(GroupModel { name, resources });
        }

        Self::new(access_list, parsed_groups)
    }

    /// Private key configured for `public_key`
    pub fn get_private_key(&self, public_key: &str) -> Option<&str> {
        self.access_list
            .iter()
            .find(|entry| entry.public_key == public_key)
            .and_then(|entry| entry.private_key.as_deref())
    }
}

impl AccessControl for ArrayAdapter {
    fn get_groups(&self, page: usize, limit: usize) -> Result<GroupsPage> {
        let offset = page.saturating_sub(1).saturating_mul(limit);
        Ok(GroupsPage {
            groups: self.groups.iter().skip(offset).take(limit).cloned().collect(),
            hits: self.groups.len(),
        })
    }

    fn get_group(&self, name: &str) -> Result<Option<Vec<String>>> {
        Ok(self
            .groups
            .iter()
            .find(|group| group.name == name)
            .map(|group| group.resources.clone()))
    }

    fn public_key_exists(&self, public_key: &str) -> Result<bool> {
        Ok(self.access_list.iter().any(|entry| entry.public_key == public_key))
    }

    fn get_access_list_for_public_key(&self, public_key: &str) -> Result<Vec<AccessRuleModel>> {
        Ok(self
            .access_list
            .iter()
            .filter(|entry| entry.public_key == public_key)
            .flat_map(|entry| entry.acl.iter().enumerate())
            .map(|(index, rule)| AccessRuleModel {
                id: index as u64 + 1,
                users: rule.users.clone().unwrap_or_default(),
                group: rule.group.clone(),
                resources: rule.resources.clone(),
            })
            .collect())
    }
}
