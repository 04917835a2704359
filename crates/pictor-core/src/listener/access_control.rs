use std::any::Any;

use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::error::AccessControlError;
use crate::event::error::EventSystemError;
use crate::event::listener::{CallbackSpec, Listener, ListenerDefinition, Subscriptions, parse_params};
use crate::event::Event;
use crate::kernel::error::Result;
use crate::kernel::lock;
use crate::resource::all_resources;

/// Event argument that, when `true`, turns the access check off
pub const ARG_SKIP_ACCESS_CONTROL: &str = "skipAccessControl";

/// Resources a key may always use for its own access rules
const OWN_PUBLIC_KEY_RESOURCES: [&str; 6] = [
    "accessrule.get",
    "accessrule.head",
    "accessrule.options",
    "accessrules.get",
    "accessrules.head",
    "accessrules.options",
];

/// Resources a key may use for groups its rules refer to
const GROUP_LOOKUP_RESOURCES: [&str; 3] = ["group.get", "group.head", "group.options"];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessControlParams {
    /// Custom resources to guard on top of the built-in ones
    #[serde(default)]
    pub additional_resources: Vec<String>,
}

/// Checks the request's public key against the access control adapter
/// before any resource runs.
///
/// Once a route has matched, the listener subscribes itself to every
/// resource event at priority 500, so the check happens ahead of the
/// resource listeners.
#[derive(Debug, Clone, Default)]
pub struct AccessControlListener {
    params: AccessControlParams,
}

impl AccessControlListener {
    pub fn new(params: AccessControlParams) -> Self {
        Self { params }
    }

    pub fn subscribe(&self, event: &mut Event) -> Result<()> {
        let events = all_resources()
            .into_iter()
            .map(str::to_string)
            .chain(self.params.additional_resources.iter().cloned())
            .map(|resource| (resource, CallbackSpec::prioritized("checkAccess", 500)));

        let handler = event.handler()?;
        debug!("Guarding resources with access control listener '{}'", handler);
        event.manager()?.add_callbacks(&handler, events, None)?;
        Ok(())
    }

    pub fn check_access(&self, event: &mut Event) -> Result<()> {
        if event.has_argument(ARG_SKIP_ACCESS_CONTROL) && event.get_argument::<bool>(ARG_SKIP_ACCESS_CONTROL)? {
            return Ok(());
        }

        let resource = event.name().unwrap_or_default().to_string();
        let access_control = event.access_control()?;
        let request = event.request()?;
        let request = lock(&request, "request")?;

        let public_key = match request.public_key() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => return Err(AccessControlError::MissingPublicKey.into()),
        };

        if access_control.has_access(&public_key, &resource, request.user())? {
            return Ok(());
        }

        let route = request.route();
        if OWN_PUBLIC_KEY_RESOURCES.contains(&resource.as_str())
            && route.and_then(|route| route.get("publickey")) == Some(public_key.as_str())
        {
            return Ok(());
        }

        if GROUP_LOOKUP_RESOURCES.contains(&resource.as_str()) {
            if let Some(group) = route.and_then(|route| route.get("group")) {
                let rules = access_control.get_access_list_for_public_key(&public_key)?;
                if rules.iter().any(|rule| rule.group.as_deref() == Some(group)) {
                    return Ok(());
                }
            }
        }

        warn!("Public key '{}' denied access to {}", public_key, resource);
        Err(AccessControlError::PermissionDenied { public_key, resource }.into())
    }
}

impl Listener for AccessControlListener {
    fn handle(&mut self, method: &str, event: &mut Event) -> Result<()> {
        match method {
            "subscribe" => self.subscribe(event),
            "checkAccess" => self.check_access(event),
            other => Err(EventSystemError::UnknownMethod {
                handler: Self::IDENTIFIER.to_string(),
                method: other.to_string(),
            }
            .into()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ListenerDefinition for AccessControlListener {
    const IDENTIFIER: &'static str = "access-control";

    fn subscribed_events() -> Subscriptions {
        vec![("route.match".to_string(), CallbackSpec::method("subscribe"))]
    }

    fn from_params(params: &Value) -> Result<Self> {
        Ok(Self::new(parse_params(Self::IDENTIFIER, params)?))
    }
}
