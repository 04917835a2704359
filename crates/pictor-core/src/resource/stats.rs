use std::any::Any;

use serde_json::Value;

use crate::event::Event;
use crate::event::listener::{CallbackSpec, Listener, ListenerDefinition, Subscriptions};
use crate::kernel::error::Result;
use crate::resource::unknown_method;

/// `/stats`: image, user and byte counts.
#[derive(Debug, Clone, Default)]
pub struct StatsResource;

impl Listener for StatsResource {
    fn handle(&mut self, method: &str, event: &mut Event) -> Result<()> {
        match method {
            "get" | "head" => {
                event.manager()?.trigger("db.stats.load")?;
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

impl ListenerDefinition for StatsResource {
    const IDENTIFIER: &'static str = "stats";

    fn subscribed_events() -> Subscriptions {
        vec![
            ("stats.get".to_string(), CallbackSpec::method("get")),
            ("stats.head".to_string(), CallbackSpec::method("head")),
        ]
    }

    fn from_params(_params: &Value) -> Result<Self> {
        Ok(Self)
    }
}
