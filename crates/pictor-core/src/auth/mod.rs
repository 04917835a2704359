//! Access control: which public key may use which resource for which user.
pub mod array;
pub mod error;

use std::fmt::Debug;

use crate::kernel::error::Result;
use crate::model::{AccessRuleModel, GroupModel};

pub use array::ArrayAdapter;
pub use error::AccessControlError;

/// One page of resource groups plus the total number of groups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupsPage {
    pub groups: Vec<GroupModel>,
    pub hits: usize,
}

pub trait AccessControl: Send + Sync + Debug {
    /// Groups in declaration order, `page` is 1-based
    fn get_groups(&self, page: usize, limit: usize) -> Result<GroupsPage>;

    /// Resources of a group, `None` if it does not exist
    fn get_group(&self, name: &str) -> Result<Option<Vec<String>>>;

    fn public_key_exists(&self, public_key: &str) -> Result<bool>;

    /// Rules granted to a key, numbered from 1
    fn get_access_list_for_public_key(&self, public_key: &str) -> Result<Vec<AccessRuleModel>>;

    fn get_access_rule(&self, public_key: &str, id: u64) -> Result<Option<AccessRuleModel>> {
        Ok(self
            .get_access_list_for_public_key(public_key)?
            .into_iter()
            .find(|rule| rule.id == id))
    }

    /// Whether `public_key` may use `resource` (an event name such as
    /// `image.get`) on behalf of `user`.
    fn has_access(&self, public_key: &str, resource: &str, user: Option<&str>) -> Result<bool> {
        for rule in self.get_access_list_for_public_key(public_key)? {
            let resources = match &rule.group {
                Some(group) => self.get_group(group)?.unwrap_or_default(),
                None => rule.resources.clone(),
            };

            if resources.iter().any(|r| r == resource) && rule.users.allows(user) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
