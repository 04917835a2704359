use std::any::Any;

use serde_json::Value;

use crate::auth::AccessControlError;
use crate::event::Event;
use crate::event::listener::{CallbackSpec, Listener, ListenerDefinition, Subscriptions};
use crate::kernel::constants::DEFAULT_PAGE_LIMIT;
use crate::kernel::error::{Error, Result};
use crate::kernel::lock;
use crate::listener::positive_param;
use crate::model::{GroupModel, GroupsModel, Model};
use crate::resource::unknown_method;

/// `/groups`: paginated list of resource groups.
#[derive(Debug, Clone, Default)]
pub struct GroupsResource;

impl GroupsResource {
    pub fn get(&self, event: &mut Event) -> Result<()> {
        let (page, limit) = {
            let request = event.request()?;
            let request = lock(&request, "request")?;
            (
                positive_param(&request, "page", 1)?,
                positive_param(&request, "limit", DEFAULT_PAGE_LIMIT)?,
            )
        };

        let found = event.access_control()?.get_groups(page, limit)?;
        let model = GroupsModel {
            groups: found.groups,
            hits: found.hits,
            page,
            limit,
        };
        lock(&*event.response()?, "response")?.set_model(Model::Groups(model));
        Ok(())
    }
}

impl Listener for GroupsResource {
    fn handle(&mut self, method: &str, event: &mut Event) -> Result<()> {
        match method {
            "get" | "head" => self.get(event),
            other => Err(unknown_method(Self::IDENTIFIER, other)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ListenerDefinition for GroupsResource {
    const IDENTIFIER: &'static str = "groups";

    fn subscribed_events() -> Subscriptions {
        vec![
            ("groups.get".to_string(), CallbackSpec::method("get")),
            ("groups.head".to_string(), CallbackSpec::method("head")),
        ]
    }

    fn from_params(_params: &Value) -> Result<Self> {
        Ok(Self)
    }
}

/// `/groups/{group}`: the resources of one group.
#[derive(Debug, Clone, Default)]
pub struct GroupResource;

impl GroupResource {
    pub fn get(&self, event: &mut Event) -> Result<()> {
        let name = {
            let request = event.request()?;
            let request = lock(&request, "request")?;
            request
                .route()
                .and_then(|route| route.get("group"))
                .map(str::to_owned)
                .ok_or_else(|| Error::bad_request("Missing group"))?
        };

        let resources = event
            .access_control()?
            .get_group(&name)?
            .ok_or_else(|| AccessControlError::GroupNotFound(name.clone()))?;

        lock(&*event.response()?, "response")?.set_model(Model::Group(GroupModel { name, resources }));
        Ok(())
    }
}

impl Listener for GroupResource {
    fn handle(&mut self, method: &str, event: &mut Event) -> Result<()> {
        match method {
            "get" | "head" => self.get(event),
            other => Err(unknown_method(Self::IDENTIFIER, other)),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ListenerDefinition for GroupResource {
    const IDENTIFIER: &'static str = "group";

    fn subscribed_events() -> Subscriptions {
        vec![
            ("group.get".to_string(), CallbackSpec::method("get")),
            ("group.head".to_string(), CallbackSpec::method("head")),
        ]
    }

    fn from_params(_params: &Value) -> Result<Self> {
        Ok(Self)
    }
}
