pub mod error;
pub mod listener;
pub mod manager;
pub mod queue;

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::auth::AccessControl;
use crate::config::ConfigData;
use crate::database::Database;
use crate::event::error::EventSystemError;
use crate::http::request::SharedRequest;
use crate::http::response::SharedResponse;
use crate::image::input_loader::InputLoaderManager;
use crate::image::output_converter::OutputConverterManager;
use crate::image::transformation::TransformationManager;
use crate::kernel::Shared;
use crate::kernel::error::Result;
use crate::storage::Storage;

/// Well known argument keys carried by every pipeline event
pub const ARG_REQUEST: &str = "request";
pub const ARG_RESPONSE: &str = "response";
pub const ARG_DATABASE: &str = "database";
pub const ARG_STORAGE: &str = "storage";
pub const ARG_ACCESS_CONTROL: &str = "accessControl";
pub const ARG_MANAGER: &str = "manager";
pub const ARG_CONFIG: &str = "config";
pub const ARG_HANDLER: &str = "handler";
pub const ARG_TRANSFORMATION_MANAGER: &str = "transformationManager";
pub const ARG_OUTPUT_CONVERTER_MANAGER: &str = "outputConverterManager";
pub const ARG_INPUT_LOADER_MANAGER: &str = "inputLoaderManager";

/// A single argument value. Cloning an event shares these.
pub type Argument = Arc<dyn Any + Send + Sync>;

/// Argument bag used when replacing or extending an event's arguments
pub type Arguments = HashMap<String, Argument>;

/// Wrap a value so it can be placed in an [`Arguments`] map.
pub fn argument<T: Any + Send + Sync>(value: T) -> Argument {
    Arc::new(value)
}

/// A named occurrence flowing through the pipeline.
///
/// The manager clones a per-request template for every trigger, names the
/// clone and merges in the extra arguments. Listeners read collaborators out
/// of the argument bag and may stop propagation.
#[derive(Clone, Default)]
pub struct Event {
    name: Option<String>,
    arguments: Arguments,
    propagation_stopped: bool,
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.arguments.keys().collect();
        keys.sort();
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("arguments", &keys)
            .field("propagation_stopped", &self.propagation_stopped)
            .finish()
    }
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an event with an initial argument bag
    pub fn with_arguments(arguments: Arguments) -> Self {
        Self {
            name: None,
            arguments,
            propagation_stopped: false,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// Stop the remaining listeners of the current trigger. Cannot be undone.
    pub fn stop_propagation(&mut self) -> &mut Self {
        self.propagation_stopped = true;
        self
    }

    /// Fetch an argument, cloned out of the bag.
    ///
    /// Fails with [`EventSystemError::ArgumentNotFound`] when the key is missing
    /// and [`EventSystemError::ArgumentTypeMismatch`] when it holds another type.
    pub fn get_argument<T: Any + Send + Sync + Clone>(&self, key: &str) -> Result<T> {
        let value = self.arguments.get(key).ok_or_else(|| EventSystemError::ArgumentNotFound {
            key: key.to_string(),
            event_name: self.display_name().to_string(),
        })?;

        value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| {
                EventSystemError::ArgumentTypeMismatch {
                    key: key.to_string(),
                    event_name: self.display_name().to_string(),
                    expected: type_name::<T>(),
                }
                .into()
            })
    }

    pub fn set_argument<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) -> &mut Self {
        self.arguments.insert(key.into(), Arc::new(value));
        self
    }

    /// Replace the whole argument bag
    pub fn set_arguments(&mut self, arguments: Arguments) -> &mut Self {
        self.arguments = arguments;
        self
    }

    /// Merge arguments into the bag, overwriting existing keys
    pub fn merge_arguments(&mut self, arguments: Arguments) -> &mut Self {
        self.arguments.extend(arguments);
        self
    }

    pub fn has_argument(&self, key: &str) -> bool {
        self.arguments.contains_key(key)
    }

    pub fn request(&self) -> Result<SharedRequest> {
        self.get_argument(ARG_REQUEST)
    }

    pub fn response(&self) -> Result<SharedResponse> {
        self.get_argument(ARG_RESPONSE)
    }

    pub fn database(&self) -> Result<Arc<dyn Database>> {
        self.get_argument(ARG_DATABASE)
    }

    pub fn storage(&self) -> Result<Arc<dyn Storage>> {
        self.get_argument(ARG_STORAGE)
    }

    pub fn access_control(&self) -> Result<Arc<dyn AccessControl>> {
        self.get_argument(ARG_ACCESS_CONTROL)
    }

    pub fn manager(&self) -> Result<manager::EventManager> {
        self.get_argument(ARG_MANAGER)
    }

    pub fn transformation_manager(&self) -> Result<Shared<TransformationManager>> {
        self.get_argument(ARG_TRANSFORMATION_MANAGER)
    }

    pub fn output_converter_manager(&self) -> Result<Arc<OutputConverterManager>> {
        self.get_argument(ARG_OUTPUT_CONVERTER_MANAGER)
    }

    pub fn input_loader_manager(&self) -> Result<Arc<InputLoaderManager>> {
        self.get_argument(ARG_INPUT_LOADER_MANAGER)
    }

    pub fn config(&self) -> Result<Arc<ConfigData>> {
        self.get_argument(ARG_CONFIG)
    }

    /// Name of the handler currently being invoked
    pub fn handler(&self) -> Result<String> {
        self.get_argument(ARG_HANDLER)
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

/// Re-export important types
pub use listener::{
    CallbackSpec, Handler, HandlerSpec, Initializer, Listener, ListenerCatalog, ListenerDefinition,
    SharedListener, Subscriptions, UserFilter,
};
pub use manager::EventManager;
pub use queue::PriorityQueue;
