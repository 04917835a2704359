use std::any::Any;

use serde_json::Value;

use crate::event::Event;
use crate::event::listener::{CallbackSpec, Listener, ListenerDefinition, Subscriptions};
use crate::kernel::error::Result;
use crate::resource::unknown_method;

/// `/users/{user}`: image count and last modification of a user.
#[derive(Debug, Clone, Default)]
pub struct UserResource;

impl Listener for UserResource {
    fn handle(&mut self, method: &str, event: &mut Event) -> Result<()> {
        match method {
            "get" | "head" => {
                event.manager()?.trigger("db.user.load")?;
                Ok(())
            }
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

impl ListenerDefinition for UserResource {
    const IDENTIFIER: &'static str = "user";

    fn subscribed_events() -> Subscriptions {
        vec![
            ("user.get".to_string(), CallbackSpec::method("get")),
            ("user.head".to_string(), CallbackSpec::method("head")),
        ]
    }

    fn from_params(_params: &Value) -> Result<Self> {
        Ok(Self)
    }
}
