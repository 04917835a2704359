use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use log::{debug, trace};
use serde_json::Value;

use crate::event::error::EventSystemError;
use crate::event::listener::{
    CallbackSpec, Handler, HandlerSpec, Initializer, ListenerCatalog, SharedListener, UserFilter,
};
use crate::event::queue::PriorityQueue;
use crate::event::{ARG_HANDLER, ARG_MANAGER, Arguments, Event};
use crate::kernel::error::Result;
use crate::kernel::lock;

/// A registered handler, lazy until first use
enum HandlerSlot {
    Lazy { identifier: String, params: Value },
    Ready(Handler),
}

/// One queued registration of a handler for an event name
#[derive(Debug, Clone)]
struct Descriptor {
    handler: String,
    method: Option<String>,
    users: Option<UserFilter>,
}

struct ManagerState {
    handlers: HashMap<String, HandlerSlot>,
    callbacks: HashMap<String, PriorityQueue<Descriptor>>,
    initializers: Vec<Arc<dyn Initializer>>,
    template: Event,
}

/// Priority ordered, wildcard aware event dispatcher.
///
/// Cheap to clone: clones share the same registrations. Listeners receive a
/// clone under the `manager` argument and may register further callbacks or
/// trigger nested events while they run.
#[derive(Clone)]
pub struct EventManager {
    state: Arc<Mutex<ManagerState>>,
    catalog: Arc<ListenerCatalog>,
}

// Manual Debug impl for EventManager
impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventManager {
    /// Create a manager without any lazily constructible listeners
    pub fn new() -> Self {
        Self::with_catalog(Arc::new(ListenerCatalog::new()))
    }

    pub fn with_catalog(catalog: Arc<ListenerCatalog>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManagerState {
                handlers: HashMap::new(),
                callbacks: HashMap::new(),
                initializers: Vec::new(),
                template: Event::new(),
            })),
            catalog,
        }
    }

    pub fn catalog(&self) -> &ListenerCatalog {
        &self.catalog
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, ManagerState>> {
        self.state.lock().map_err(|_| {
            EventSystemError::DispatcherPoisoned {
                component: "manager_state".to_string(),
            }
            .into()
        })
    }

    /// Register a handler under `name`, replacing any previous registration.
    pub fn add_event_handler(&self, name: &str, handler: HandlerSpec) -> Result<&Self> {
        let slot = match handler {
            HandlerSpec::ByIdentifier { identifier, params } => {
                if !self.catalog.contains(&identifier) {
                    return Err(EventSystemError::UnknownListenerIdentifier(identifier).into());
                }
                HandlerSlot::Lazy { identifier, params }
            }
            HandlerSpec::Listener(listener) => HandlerSlot::Ready(Handler::Listener(listener)),
            HandlerSpec::Callback(callback) => HandlerSlot::Ready(Handler::Callback(callback)),
        };

        self.lock_state()?.handlers.insert(name.to_string(), slot);
        Ok(self)
    }

    /// Subscribe handler `handler` to a set of events.
    pub fn add_callbacks<I, S>(&self, handler: &str, events: I, users: Option<UserFilter>) -> Result<&Self>
    where
        I: IntoIterator<Item = (S, CallbackSpec)>,
        S: Into<String>,
    {
        let mut state = self.lock_state()?;

        for (event_name, spec) in events {
            let queue = state.callbacks.entry(event_name.into()).or_default();
            let descriptor = |method: Option<String>| Descriptor {
                handler: handler.to_string(),
                method,
                users: users.clone(),
            };

            match spec {
                CallbackSpec::Method(method) => queue.insert(descriptor(Some(method)), 0),
                CallbackSpec::Methods(methods) => {
                    for (method, priority) in methods {
                        queue.insert(descriptor(Some(method)), priority);
                    }
                }
                CallbackSpec::Priority(priority) => queue.insert(descriptor(None), priority),
            }
        }

        Ok(self)
    }

    /// Subscribe from a JSON object of `event name -> definition`.
    ///
    /// Every definition is validated before anything is registered.
    pub fn add_callbacks_from_value(&self, handler: &str, events: &Value, users: Option<UserFilter>) -> Result<&Self> {
        let invalid = || EventSystemError::InvalidListenerDefinition {
            handler: handler.to_string(),
        };

        let map = events.as_object().ok_or_else(invalid)?;
        let mut parsed = Vec::with_capacity(map.len());
        for (event_name, definition) in map {
            let spec = CallbackSpec::from_value(definition).ok_or_else(invalid)?;
            parsed.push((event_name.clone(), spec));
        }

        self.add_callbacks(handler, parsed, users)
    }

    /// Register a catalog listener and subscribe it to its own events.
    pub fn add_listener(&self, name: &str, identifier: &str, params: Value, users: Option<UserFilter>) -> Result<&Self> {
        let subscriptions = self.catalog.subscriptions(identifier)?;
        self.add_event_handler(name, HandlerSpec::with_params(identifier, params))?
            .add_callbacks(name, subscriptions, users)
    }

    /// Register an existing listener instance under `name` with explicit subscriptions.
    pub fn add_listener_instance<I, S>(&self, name: &str, listener: SharedListener, events: I) -> Result<&Self>
    where
        I: IntoIterator<Item = (S, CallbackSpec)>,
        S: Into<String>,
    {
        self.add_event_handler(name, HandlerSpec::Listener(listener))?
            .add_callbacks(name, events, None)
    }

    /// Resolve a handler, constructing and initializing it on first use.
    pub fn get_handler_instance(&self, name: &str) -> Result<Handler> {
        let (identifier, params, initializers) = {
            let state = self.lock_state()?;
            match state.handlers.get(name) {
                Some(HandlerSlot::Ready(handler)) => return Ok(handler.clone()),
                Some(HandlerSlot::Lazy { identifier, params }) => {
                    (identifier.clone(), params.clone(), state.initializers.clone())
                }
                None => return Err(EventSystemError::UnknownHandler(name.to_string()).into()),
            }
        };

        debug!("Constructing listener '{}' ({})", name, identifier);
        let listener = self.catalog.construct(&identifier, &params)?;
        {
            let mut instance = lock(&listener, name)?;
            for initializer in &initializers {
                initializer.initialize(&mut *instance)?;
            }
        }

        let handler = Handler::Listener(listener);
        self.lock_state()?
            .handlers
            .insert(name.to_string(), HandlerSlot::Ready(handler.clone()));
        Ok(handler)
    }

    pub fn add_initializer(&self, initializer: Arc<dyn Initializer>) -> Result<&Self> {
        self.lock_state()?.initializers.push(initializer);
        Ok(self)
    }

    pub fn initializers(&self) -> Result<Vec<Arc<dyn Initializer>>> {
        Ok(self.lock_state()?.initializers.clone())
    }

    /// Set the event every trigger starts from
    pub fn set_event_template(&self, event: Event) -> Result<&Self> {
        self.lock_state()?.template = event;
        Ok(self)
    }

    pub fn trigger(&self, event_name: &str) -> Result<&Self> {
        self.trigger_with(event_name, Arguments::new())
    }

    /// Dispatch `event_name` to every matching listener.
    ///
    /// Listeners run bucket by bucket (`*`, each ancestor wildcard, then the
    /// exact name), in priority order within a bucket. Errors raised by a
    /// listener are returned untouched.
    pub fn trigger_with(&self, event_name: &str, arguments: Arguments) -> Result<&Self> {
        let (mut event, descriptors) = {
            let state = self.lock_state()?;
            let mut event = state.template.clone();
            event.set_name(event_name);
            event.set_argument(ARG_MANAGER, self.clone());
            event.merge_arguments(arguments);
            (event, Self::listeners_for_event(&state.callbacks, event_name))
        };

        let request = event.request()?;
        let user = lock(&request, "request")?.user().map(str::to_owned);

        for descriptor in descriptors {
            event.set_argument(ARG_HANDLER, descriptor.handler.clone());
            let handler = self.get_handler_instance(&descriptor.handler)?;

            if !Self::triggers_for(user.as_deref(), descriptor.users.as_ref()) {
                trace!("Skipping '{}' for '{}': user filtered", descriptor.handler, event_name);
                continue;
            }

            trace!(
                "Dispatching '{}' to '{}'{}",
                event_name,
                descriptor.handler,
                descriptor.method.as_deref().map(|m| format!("::{}", m)).unwrap_or_default()
            );
            Self::invoke(&handler, &descriptor, &mut event)?;

            if event.is_propagation_stopped() {
                break;
            }
        }

        Ok(self)
    }

    fn invoke(handler: &Handler, descriptor: &Descriptor, event: &mut Event) -> Result<()> {
        let busy = || EventSystemError::ListenerBusy {
            handler: descriptor.handler.clone(),
            event_name: event.name().unwrap_or_default().to_string(),
        };
        let poisoned = || EventSystemError::DispatcherPoisoned {
            component: format!("listener:{}", descriptor.handler),
        };

        match handler {
            Handler::Listener(listener) => {
                let mut instance = match listener.try_lock() {
                    Ok(guard) => guard,
                    Err(TryLockError::WouldBlock) => return Err(busy().into()),
                    Err(TryLockError::Poisoned(_)) => return Err(poisoned().into()),
                };
                match descriptor.method.as_deref() {
                    Some(method) => instance.handle(method, event),
                    None => instance.call(event),
                }
            }
            Handler::Callback(callback) => {
                if let Some(method) = &descriptor.method {
                    return Err(EventSystemError::CallbackWithMethod {
                        handler: descriptor.handler.clone(),
                        method: method.clone(),
                    }
                    .into());
                }
                let mut callable = match callback.try_lock() {
                    Ok(guard) => guard,
                    Err(TryLockError::WouldBlock) => return Err(busy().into()),
                    Err(TryLockError::Poisoned(_)) => return Err(poisoned().into()),
                };
                (&mut *callable)(event)
            }
        }
    }

    /// Copy-then-drain every matching bucket, in bucket order.
    fn listeners_for_event(callbacks: &HashMap<String, PriorityQueue<Descriptor>>, event_name: &str) -> Vec<Descriptor> {
        let mut listeners = Vec::new();

        for name in Self::event_name_parts(event_name) {
            if let Some(queue) = callbacks.get(&name) {
                listeners.extend(queue.clone().drain());
            }
        }

        listeners
    }

    /// `a.b.c` yields `*`, `a.*`, `a.b.*`, `a.b.c`
    fn event_name_parts(event_name: &str) -> Vec<String> {
        let mut parts = vec!["*".to_string()];

        for (offset, _) in event_name.match_indices('.').filter(|(offset, _)| *offset > 0) {
            parts.push(format!("{}.*", &event_name[..offset]));
        }

        parts.push(event_name.to_string());
        parts
    }

    /// Whether the exact event name has listeners. Wildcard buckets are not consulted.
    pub fn has_listeners_for_event(&self, event_name: &str) -> Result<bool> {
        Ok(self
            .lock_state()?
            .callbacks
            .get(event_name)
            .is_some_and(|queue| !queue.is_empty()))
    }

    /// Whether a registration with `filter` fires for `user`.
    ///
    /// Anonymous requests always pass. With both lists non-empty nothing does.
    pub fn triggers_for(user: Option<&str>, filter: Option<&UserFilter>) -> bool {
        let (user, filter) = match (user, filter) {
            (Some(user), Some(filter)) if !user.is_empty() => (user, filter),
            _ => return true,
        };

        let whitelisted = filter.whitelist.iter().any(|u| u == user);
        let blacklisted = filter.blacklist.iter().any(|u| u == user);

        if filter.whitelist.is_empty() && filter.blacklist.is_empty() {
            return true;
        }

        if filter.whitelist.is_empty() && !blacklisted {
            return true;
        }

        if filter.blacklist.is_empty() && whitelisted {
            return true;
        }

        false
    }
}
