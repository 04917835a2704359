use std::any::Any;

use serde_json::Value;

use crate::auth::AccessControlError;
use crate::event::Event;
use crate::event::listener::{CallbackSpec, Listener, ListenerDefinition, Subscriptions};
use crate::kernel::error::{Error, Result};
use crate::kernel::lock;
use crate::model::{AccessRulesModel, Model};
use crate::resource::unknown_method;

/// Route parameter as an owned string, 400 when absent
fn route_param(event: &Event, name: &str) -> Result<String> {
    let request = event.request()?;
    let request = lock(&request, "request")?;
    request
        .route()
        .and_then(|route| route.get(name))
        .map(str::to_owned)
        .ok_or_else(|| Error::bad_request(format!("Missing {}", name)))
}

/// Public key of the route, 404 when the adapter does not know it
fn known_public_key(event: &Event) -> Result<String> {
    let public_key = route_param(event, "publickey")?;
    if !event.access_control()?.public_key_exists(&public_key)? {
        return Err(AccessControlError::UnknownPublicKey(public_key).into());
    }
    Ok(public_key)
}

/// `/keys/{publickey}/access`: every rule granted to a key.
#[derive(Debug, Clone, Default)]
pub struct AccessRulesResource;

impl AccessRulesResource {
    pub fn get(&self, event: &mut Event) -> Result<()> {
        let public_key = known_public_key(event)?;
        let rules = event.access_control()?.get_access_list_for_public_key(&public_key)?;
        lock(&*event.response()?, "response")?.set_model(Model::AccessRules(AccessRulesModel { rules }));
        Ok(())
    }
}

impl Listener for AccessRulesResource {
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

impl ListenerDefinition for AccessRulesResource {
    const IDENTIFIER: &'static str = "accessrules";

    fn subscribed_events() -> Subscriptions {
        vec![
            ("accessrules.get".to_string(), CallbackSpec::method("get")),
            ("accessrules.head".to_string(), CallbackSpec::method("head")),
        ]
    }

    fn from_params(_params: &Value) -> Result<Self> {
        Ok(Self)
    }
}

/// `/keys/{publickey}/access/{accessRuleId}`: a single rule.
#[derive(Debug, Clone, Default)]
pub struct AccessRuleResource;

impl AccessRuleResource {
    pub fn get(&self, event: &mut Event) -> Result<()> {
        let public_key = known_public_key(event)?;
        let raw_id = route_param(event, "accessRuleId")?;
        let id: u64 = raw_id
            .parse()
            .map_err(|_| Error::bad_request(format!("Invalid access rule id: {}", raw_id)))?;

        let rule = event
            .access_control()?
            .get_access_rule(&public_key, id)?
            .ok_or(AccessControlError::AccessRuleNotFound { public_key, id })?;

        lock(&*event.response()?, "response")?.set_model(Model::AccessRule(rule));
        Ok(())
    }
}

impl Listener for AccessRuleResource {
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

impl ListenerDefinition for AccessRuleResource {
    const IDENTIFIER: &'static str = "accessrule";

    fn subscribed_events() -> Subscriptions {
        vec![
            ("accessrule.get".to_string(), CallbackSpec::method("get")),
            ("accessrule.head".to_string(), CallbackSpec::method("head")),
        ]
    }

    fn from_params(_params: &Value) -> Result<Self> {
        Ok(Self)
    }
}
