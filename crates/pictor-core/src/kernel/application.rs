use std::fmt;
use std::sync::Arc;

use ::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use ::http::{HeaderValue, StatusCode};
use log::{debug, error, info, warn};
use serde_json::{Map, Value};

use crate::auth::{AccessControl, ArrayAdapter};
use crate::config::{ConfigData, DatabaseConfig, EventListenerConfig, StorageConfig};
use crate::database::{Database, MemoryDatabase};
use crate::event::listener::{HandlerSpec, Initializer, ListenerCatalog, ListenerDefinition, SharedListener};
use crate::event::manager::EventManager;
use crate::event::{
    ARG_ACCESS_CONTROL, ARG_CONFIG, ARG_DATABASE, ARG_INPUT_LOADER_MANAGER, ARG_OUTPUT_CONVERTER_MANAGER,
    ARG_REQUEST, ARG_RESPONSE, ARG_STORAGE, ARG_TRANSFORMATION_MANAGER, Arguments, Event, argument,
};
use crate::http::formatter::{Formatter, JsonFormatter};
use crate::http::request::{Request, SharedRequest};
use crate::http::response::{Response, SharedResponse};
use crate::http::response_formatter::{ARG_NO_STRICT, ResponseFormatter};
use crate::http::router::Router;
use crate::image::{InputLoaderManager, OutputConverterManager, TransformationManager};
use crate::kernel::constants::{APP_NAME, APP_VERSION};
use crate::kernel::error::{Error, Result};
use crate::kernel::{Shared, lock, shared};
use crate::listener::{AccessControlListener, DatabaseOperations, StorageOperations};
use crate::model::{ErrorModel, Model};
use crate::resource::{
    AccessRuleResource, AccessRulesResource, GroupResource, GroupsResource, ImageResource, ImagesResource,
    MetadataResource, StatsResource, StatusResource, UserResource,
};
use crate::storage::{FilesystemStorage, Storage};

/// Built-in listeners, registered for every request under their own identifiers
const BUILTIN_LISTENERS: [&str; 13] = [
    StatusResource::IDENTIFIER,
    StatsResource::IDENTIFIER,
    UserResource::IDENTIFIER,
    ImagesResource::IDENTIFIER,
    ImageResource::IDENTIFIER,
    MetadataResource::IDENTIFIER,
    GroupsResource::IDENTIFIER,
    GroupResource::IDENTIFIER,
    AccessRulesResource::IDENTIFIER,
    AccessRuleResource::IDENTIFIER,
    DatabaseOperations::IDENTIFIER,
    StorageOperations::IDENTIFIER,
    ResponseFormatter::IDENTIFIER,
];

/// Catalog with every built-in listener
pub fn default_catalog() -> ListenerCatalog {
    let mut catalog = ListenerCatalog::new();
    catalog
        .register::<StatusResource>()
        .register::<StatsResource>()
        .register::<UserResource>()
        .register::<ImagesResource>()
        .register::<ImageResource>()
        .register::<MetadataResource>()
        .register::<GroupsResource>()
        .register::<GroupResource>()
        .register::<AccessRulesResource>()
        .register::<AccessRuleResource>()
        .register::<DatabaseOperations>()
        .register::<StorageOperations>()
        .register::<ResponseFormatter>()
        .register::<AccessControlListener>()
        .register::<TransformationManager>();
    catalog
}

/// Runs requests through the event pipeline.
///
/// The application itself is immutable once built and can be shared between
/// threads. Every call to [`Application::handle`] gets its own
/// [`EventManager`], request, response and transformation manager; the
/// adapters and image managers are shared.
pub struct Application {
    config: Arc<ConfigData>,
    storage: Arc<dyn Storage>,
    database: Arc<dyn Database>,
    access_control: Option<Arc<dyn AccessControl>>,
    catalog: Arc<ListenerCatalog>,
    initializers: Vec<Arc<dyn Initializer>>,
    router: Router,
    output_converters: Arc<OutputConverterManager>,
    input_loaders: Arc<InputLoaderManager>,
    transformations: TransformationManager,
    event_listeners: Vec<(String, EventListenerConfig)>,
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("storage", &self.storage)
            .field("database", &self.database)
            .field("access_control", &self.access_control)
            .field("catalog", &self.catalog)
            .field("transformations", &self.transformations)
            .field("event_listeners", &self.event_listeners)
            .finish_non_exhaustive()
    }
}

impl Application {
    /// Build the adapters described by the configuration
    pub fn from_config(config: ConfigData) -> Result<Self> {
        let storage: Arc<dyn Storage> = match config.section::<StorageConfig>("storage")?.unwrap_or_default() {
            StorageConfig::Filesystem { path } => {
                info!("Using filesystem storage in {}", path.display());
                Arc::new(FilesystemStorage::new(path))
            }
        };

        let database: Arc<dyn Database> = match config.section::<DatabaseConfig>("database")?.unwrap_or_default() {
            DatabaseConfig::Memory => Arc::new(MemoryDatabase::new()),
        };

        let access_control = match config.value("accessControl") {
            None | Some(Value::Null) => None,
            Some(value) => Some(Arc::new(ArrayAdapter::from_value(value)?) as Arc<dyn AccessControl>),
        };

        Self::new(config, storage, database, access_control)
    }

    pub fn new(
        config: ConfigData,
        storage: Arc<dyn Storage>,
        database: Arc<dyn Database>,
        access_control: Option<Arc<dyn AccessControl>>,
    ) -> Result<Self> {
        info!("Initializing {} v{}", APP_NAME, APP_VERSION);

        let event_listeners = config
            .section::<Map<String, Value>>("eventListeners")?
            .unwrap_or_default()
            .into_iter()
            .map(|(name, definition)| {
                serde_json::from_value::<EventListenerConfig>(definition)
                    .map(|definition| (name.clone(), definition))
                    .map_err(|e| Error::Config(format!("Invalid event listener '{}': {}", name, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        if access_control.is_none() {
            warn!("No access control configured, every resource is open");
        }

        Ok(Self {
            config: Arc::new(config),
            storage,
            database,
            access_control,
            catalog: Arc::new(default_catalog()),
            initializers: Vec::new(),
            router: Router::new()?,
            output_converters: Arc::new(OutputConverterManager::with_defaults()),
            input_loaders: Arc::new(InputLoaderManager::with_defaults()),
            transformations: TransformationManager::new(),
            event_listeners,
        })
    }

    pub fn config(&self) -> &ConfigData {
        &self.config
    }

    /// Listener catalog used to construct handlers by identifier
    pub fn catalog_mut(&mut self) -> &mut ListenerCatalog {
        Arc::make_mut(&mut self.catalog)
    }

    /// Run `initializer` against every lazily constructed listener
    pub fn add_initializer(&mut self, initializer: Arc<dyn Initializer>) -> &mut Self {
        self.initializers.push(initializer);
        self
    }

    /// Transformations available to every request
    pub fn transformations_mut(&mut self) -> &mut TransformationManager {
        &mut self.transformations
    }

    pub fn output_converters_mut(&mut self) -> Option<&mut OutputConverterManager> {
        Arc::get_mut(&mut self.output_converters)
    }

    pub fn input_loaders_mut(&mut self) -> Option<&mut InputLoaderManager> {
        Arc::get_mut(&mut self.input_loaders)
    }

    /// Serve one request. Always produces a response; failures become
    /// error models rendered like any other payload.
    pub fn handle(&self, request: Request) -> Response {
        debug!("{} {}", request.method(), request.path());
        let request = shared(request);
        let response = shared(Response::new());

        let manager = match self.event_manager(&request, &response) {
            Ok(manager) => manager,
            Err(e) => {
                error!("Could not set up the event pipeline: {}", e);
                return fallback_response(&e);
            }
        };

        if let Err(e) = self.dispatch(&manager, &request) {
            self.recover(&manager, &request, &response, e);
        }

        if let Err(e) = manager.trigger("response.send") {
            error!("Could not send the response: {}", e);
            self.recover(&manager, &request, &response, e);
            if let Err(e) = manager.trigger("response.send") {
                error!("Could not send the error response: {}", e);
                return fallback_response(&e);
            }
        }

        let response = match lock(&response, "response") {
            Ok(response) => response.clone(),
            Err(e) => return fallback_response(&e),
        };
        response
    }

    /// Fresh manager with the event template and every listener registered
    fn event_manager(&self, request: &SharedRequest, response: &SharedResponse) -> Result<EventManager> {
        let manager = EventManager::with_catalog(self.catalog.clone());
        for initializer in &self.initializers {
            manager.add_initializer(initializer.clone())?;
        }

        let transformation_manager: Shared<TransformationManager> = shared(self.transformations.clone());

        let mut template = Event::new();
        template
            .set_argument(ARG_REQUEST, request.clone())
            .set_argument(ARG_RESPONSE, response.clone())
            .set_argument(ARG_DATABASE, self.database.clone())
            .set_argument(ARG_STORAGE, self.storage.clone())
            .set_argument(ARG_CONFIG, self.config.clone())
            .set_argument(ARG_TRANSFORMATION_MANAGER, transformation_manager.clone())
            .set_argument(ARG_OUTPUT_CONVERTER_MANAGER, self.output_converters.clone())
            .set_argument(ARG_INPUT_LOADER_MANAGER, self.input_loaders.clone());
        if let Some(access_control) = &self.access_control {
            template.set_argument(ARG_ACCESS_CONTROL, access_control.clone());
        }
        manager.set_event_template(template)?;

        for identifier in BUILTIN_LISTENERS {
            manager.add_listener(identifier, identifier, Value::Null, None)?;
        }

        let listener: SharedListener = transformation_manager;
        manager.add_listener_instance(
            TransformationManager::IDENTIFIER,
            listener,
            TransformationManager::subscribed_events(),
        )?;

        if self.access_control.is_some() {
            let params = match self.config.value("accessControl") {
                Some(value @ Value::Object(_)) => value.clone(),
                _ => Value::Null,
            };
            manager.add_listener(AccessControlListener::IDENTIFIER, AccessControlListener::IDENTIFIER, params, None)?;
        }

        for (name, definition) in &self.event_listeners {
            match &definition.events {
                Some(events) => {
                    manager
                        .add_event_handler(name, HandlerSpec::with_params(&definition.listener, definition.params.clone()))?
                        .add_callbacks_from_value(name, events, definition.users.clone())?;
                }
                None => {
                    manager.add_listener(name, &definition.listener, definition.params.clone(), definition.users.clone())?;
                }
            }
        }

        Ok(manager)
    }

    /// Route, run the resource and negotiate the representation
    fn dispatch(&self, manager: &EventManager, request: &SharedRequest) -> Result<()> {
        let event_name = {
            let mut request = lock(request, "request")?;
            let route = self.router.route(request.method(), request.path())?;
            let event_name = format!("{}.{}", route.name(), request.method().as_str().to_ascii_lowercase());
            request.set_route(route);
            event_name
        };

        manager.trigger("route.match")?;

        if !manager.has_listeners_for_event(&event_name)? {
            return Err(Error::method_not_allowed());
        }

        manager.trigger(&event_name)?.trigger("response.negotiate")?;
        Ok(())
    }

    /// Put the error on the response and negotiate its representation.
    ///
    /// Negotiation is strict first, unless the failure was itself a 406; a
    /// second, non-strict pass always picks a formatter.
    fn recover(&self, manager: &EventManager, request: &SharedRequest, response: &SharedResponse, failure: Error) {
        let status = failure.status_code();
        if status >= 500 {
            error!("Request failed: {}", failure);
        } else {
            warn!("Request failed with {}: {}", status, failure.message());
        }

        if let Err(e) = set_error(request, response, &failure) {
            error!("Could not record the error: {}", e);
            return;
        }

        if status != 406 {
            match manager.trigger("response.negotiate") {
                Ok(_) => return,
                Err(e) => {
                    debug!("Strict negotiation of the error failed: {}", e);
                    if let Err(e) = set_error(request, response, &e) {
                        error!("Could not record the error: {}", e);
                        return;
                    }
                }
            }
        }

        let mut arguments = Arguments::new();
        arguments.insert(ARG_NO_STRICT.to_string(), argument(true));
        if let Err(e) = manager.trigger_with("response.negotiate", arguments) {
            error!("Could not negotiate the error response: {}", e);
        }
    }
}

fn set_error(request: &SharedRequest, response: &SharedResponse, failure: &Error) -> Result<()> {
    let model = {
        let request = lock(request, "request")?;
        ErrorModel::from_error(failure, Some(&request))
    };
    lock(response, "response")?.set_error(model);
    Ok(())
}

/// JSON error response built without the pipeline
fn fallback_response(failure: &Error) -> Response {
    let formatter = JsonFormatter::new();
    let model = Model::Error(ErrorModel::from_error(failure, None));
    let body = formatter.format(&model).unwrap_or_default().into_bytes();

    let mut response = Response::new();
    response.set_status(StatusCode::from_u16(failure.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(formatter.content_type()));
    response.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    response.set_model(model).set_body(body);
    response
}
