use std::any::Any;

use ::http::StatusCode;
use ::http::header::CACHE_CONTROL;
use chrono::Utc;
use log::warn;
use serde_json::Value;

use crate::event::Event;
use crate::event::listener::{CallbackSpec, Listener, ListenerDefinition, Subscriptions};
use crate::kernel::error::Result;
use crate::kernel::lock;
use crate::model::{Model, StatusModel};
use crate::resource::unknown_method;

/// `/status`: whether the database and the storage are reachable.
///
/// Answers 503 when either is down, still with a status body.
#[derive(Debug, Clone, Default)]
pub struct StatusResource;

impl StatusResource {
    pub fn get(&self, event: &mut Event) -> Result<()> {
        let database = event.database()?.get_status();
        let storage = event.storage()?.get_status();

        let response = event.response()?;
        let mut response = lock(&response, "response")?;
        response.set_header(CACHE_CONTROL, "no-store, max-age=0, private")?;

        if !database || !storage {
            warn!("Status check failed: database={} storage={}", database, storage);
            response.set_status(StatusCode::SERVICE_UNAVAILABLE);
        }

        response.set_model(Model::Status(StatusModel {
            date: Utc::now(),
            database,
            storage,
        }));
        Ok(())
    }
}

impl Listener for StatusResource {
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

impl ListenerDefinition for StatusResource {
    const IDENTIFIER: &'static str = "status";

    fn subscribed_events() -> Subscriptions {
        vec![
            ("status.get".to_string(), CallbackSpec::method("get")),
            ("status.head".to_string(), CallbackSpec::method("head")),
        ]
    }

    fn from_params(_params: &Value) -> Result<Self> {
        Ok(Self)
    }
}
