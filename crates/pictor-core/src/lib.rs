pub mod auth;
pub mod config;
pub mod database;
pub mod event;
pub mod http;
pub mod image;
pub mod kernel;
pub mod listener;
pub mod model;
pub mod resource;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key public types for the binary and plugins
pub use config::ConfigData;
pub use event::listener::{CallbackSpec, Initializer, Listener, ListenerCatalog, ListenerDefinition, UserFilter};
pub use event::manager::EventManager;
pub use event::{Event, PriorityQueue};
pub use crate::http::{ContentNegotiation, Request, Response, ResponseFormatter};
pub use kernel::Application;
pub use kernel::error::{Error, Result};
pub use ::http::{HeaderMap, Method, StatusCode};
