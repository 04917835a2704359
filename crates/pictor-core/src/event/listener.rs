//! Listener contracts and the registration vocabulary of the event manager.
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::Event;
use crate::event::error::EventSystemError;
use crate::kernel::error::Result;

/// An object that reacts to events through named methods.
///
/// The manager calls [`Listener::handle`] with the method name recorded at
/// registration time. Implementations dispatch on that name and should fail
/// with [`EventSystemError::UnknownMethod`] for anything they do not know.
/// A listener instance lives as long as its event manager, so it must cope
/// with being called several times with different events.
pub trait Listener: Any + Send {
    fn handle(&mut self, method: &str, event: &mut Event) -> Result<()>;

    /// Called for subscriptions made with a bare priority and no method.
    /// Listeners that cannot be called this way keep the default, which fails
    /// with [`EventSystemError::MissingMethod`].
    fn call(&mut self, event: &mut Event) -> Result<()> {
        let _ = event;
        Err(EventSystemError::MissingMethod {
            handler: std::any::type_name::<Self>().to_string(),
        }
        .into())
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Listeners that can be constructed lazily from an identifier.
pub trait ListenerDefinition: Listener + Sized {
    /// Identifier used for lazy registration
    const IDENTIFIER: &'static str;

    /// Events this listener wants, with how it wants them
    fn subscribed_events() -> Subscriptions;

    /// Build an instance from constructor parameters (`Value::Null` when none)
    fn from_params(params: &Value) -> Result<Self>;
}

/// Runs against every lazily constructed listener, once, right after construction.
pub trait Initializer: Send + Sync {
    fn initialize(&self, listener: &mut dyn Listener) -> Result<()>;
}

/// Shared handle to a listener instance
pub type SharedListener = Arc<Mutex<dyn Listener>>;

/// A bare callable registered without a method name
pub type Callback = Arc<Mutex<dyn FnMut(&mut Event) -> Result<()> + Send>>;

/// Ordered event name to callback spec pairs
pub type Subscriptions = Vec<(String, CallbackSpec)>;

/// How a handler wants to be called for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackSpec {
    /// A single method at priority 0
    Method(String),
    /// Several methods with their own priorities
    Methods(Vec<(String, i64)>),
    /// The handler itself is the callable
    Priority(i64),
}

impl CallbackSpec {
    pub fn method(name: impl Into<String>) -> Self {
        CallbackSpec::Method(name.into())
    }

    pub fn prioritized(name: impl Into<String>, priority: i64) -> Self {
        CallbackSpec::Methods(vec![(name.into(), priority)])
    }

    /// Parse a JSON shaped definition.
    ///
    /// Accepted shapes: `"method"`, `12`, `["a", {"b": 10}]` and
    /// `{"a": 0, "b": 10}`. Returns `None` for anything else.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(method) => Some(CallbackSpec::Method(method.clone())),
            Value::Number(number) => number.as_i64().map(CallbackSpec::Priority),
            Value::Array(items) => {
                let mut methods = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(method) => methods.push((method.clone(), 0)),
                        Value::Object(map) => methods.extend(Self::prioritized_pairs(map)?),
                        _ => return None,
                    }
                }
                Some(CallbackSpec::Methods(methods))
            }
            Value::Object(map) => Some(CallbackSpec::Methods(Self::prioritized_pairs(map)?)),
            _ => None,
        }
    }

    fn prioritized_pairs(map: &serde_json::Map<String, Value>) -> Option<Vec<(String, i64)>> {
        map.iter()
            .map(|(method, priority)| priority.as_i64().map(|p| (method.clone(), p)))
            .collect()
    }
}

/// Per-registration user whitelist/blacklist
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFilter {
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub blacklist: Vec<String>,
}

impl UserFilter {
    pub fn whitelist<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            whitelist: users.into_iter().map(Into::into).collect(),
            blacklist: Vec::new(),
        }
    }

    pub fn blacklist<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            whitelist: Vec::new(),
            blacklist: users.into_iter().map(Into::into).collect(),
        }
    }
}

/// A resolved handler, ready to be invoked
#[derive(Clone)]
pub enum Handler {
    Listener(SharedListener),
    Callback(Callback),
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Listener(_) => f.write_str("Handler::Listener(..)"),
            Handler::Callback(_) => f.write_str("Handler::Callback(..)"),
        }
    }
}

/// What gets passed to `EventManager::add_event_handler`
pub enum HandlerSpec {
    /// Constructed on first use through the listener catalog
    ByIdentifier { identifier: String, params: Value },
    /// An existing listener instance
    Listener(SharedListener),
    /// A bare callable
    Callback(Callback),
}

impl HandlerSpec {
    pub fn identifier(identifier: impl Into<String>) -> Self {
        HandlerSpec::ByIdentifier {
            identifier: identifier.into(),
            params: Value::Null,
        }
    }

    pub fn with_params(identifier: impl Into<String>, params: Value) -> Self {
        HandlerSpec::ByIdentifier {
            identifier: identifier.into(),
            params,
        }
    }

    pub fn listener<L: Listener>(listener: L) -> Self {
        HandlerSpec::Listener(Arc::new(Mutex::new(listener)))
    }

    pub fn callback<F>(callback: F) -> Self
    where
        F: FnMut(&mut Event) -> Result<()> + Send + 'static,
    {
        HandlerSpec::Callback(Arc::new(Mutex::new(callback)))
    }
}

impl fmt::Debug for HandlerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerSpec::ByIdentifier { identifier, params } => f
                .debug_struct("ByIdentifier")
                .field("identifier", identifier)
                .field("params", params)
                .finish(),
            HandlerSpec::Listener(_) => f.write_str("Listener(..)"),
            HandlerSpec::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

type Constructor = Arc<dyn Fn(&Value) -> Result<SharedListener> + Send + Sync>;

#[derive(Clone)]
struct CatalogEntry {
    construct: Constructor,
    subscriptions: Subscriptions,
}

/// Identifier to constructor table backing lazy handler registration.
#[derive(Clone, Default)]
pub struct ListenerCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl fmt::Debug for ListenerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut identifiers = self.identifiers();
        identifiers.sort();
        f.debug_struct("ListenerCatalog")
            .field("identifiers", &identifiers)
            .finish()
    }
}

impl ListenerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener type under its identifier
    pub fn register<L: ListenerDefinition>(&mut self) -> &mut Self {
        let construct: Constructor = Arc::new(|params: &Value| {
            let listener: SharedListener = Arc::new(Mutex::new(L::from_params(params)?));
            Ok(listener)
        });
        self.entries.insert(
            L::IDENTIFIER.to_string(),
            CatalogEntry {
                construct,
                subscriptions: L::subscribed_events(),
            },
        );
        self
    }

    /// Register a constructor closure under an arbitrary identifier
    pub fn register_with<F>(&mut self, identifier: impl Into<String>, subscriptions: Subscriptions, construct: F) -> &mut Self
    where
        F: Fn(&Value) -> Result<SharedListener> + Send + Sync + 'static,
    {
        self.entries.insert(
            identifier.into(),
            CatalogEntry {
                construct: Arc::new(construct),
                subscriptions,
            },
        );
        self
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn construct(&self, identifier: &str, params: &Value) -> Result<SharedListener> {
        let entry = self
            .entries
            .get(identifier)
            .ok_or_else(|| EventSystemError::UnknownListenerIdentifier(identifier.to_string()))?;
        (entry.construct)(params)
    }

    pub fn subscriptions(&self, identifier: &str) -> Result<Subscriptions> {
        self.entries
            .get(identifier)
            .map(|entry| entry.subscriptions.clone())
            .ok_or_else(|| EventSystemError::UnknownListenerIdentifier(identifier.to_string()).into())
    }
}

/// Deserialize listener constructor params, mapping failures to a typed error.
pub fn parse_params<T: for<'de> Deserialize<'de> + Default>(identifier: &str, params: &Value) -> Result<T> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params.clone()).map_err(|e| {
        EventSystemError::InvalidListenerParams {
            identifier: identifier.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}
