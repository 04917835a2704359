//! # Pictor Core Event System Errors
//!
//! Defines error types specific to the event pipeline.
//!
//! This module includes [`EventSystemError`], the enum covering failures that
//! are programmer errors rather than client errors: missing or mistyped event
//! arguments, malformed listener registrations, handlers that cannot be
//! resolved and poisoned internal locks. All of them map to a 500 response.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventSystemError {
    #[error("Argument '{key}' not found in event '{event_name}'")]
    ArgumentNotFound {
        key: String,
        event_name: String,
    },

    #[error("Argument '{key}' in event '{event_name}' is not a {expected}")]
    ArgumentTypeMismatch {
        key: String,
        event_name: String,
        expected: &'static str,
    },

    #[error("Invalid event definition for listener: {handler}")]
    InvalidListenerDefinition { handler: String },

    #[error("No event handler registered under the name '{0}'")]
    UnknownHandler(String),

    #[error("No listener known by the identifier '{0}'")]
    UnknownListenerIdentifier(String),

    #[error("Listener '{handler}' has no method '{method}'")]
    UnknownMethod { handler: String, method: String },

    #[error("Listener '{handler}' must be registered with a method name")]
    MissingMethod { handler: String },

    #[error("Callback '{handler}' cannot be invoked through method '{method}'")]
    CallbackWithMethod { handler: String, method: String },

    #[error("Listener '{handler}' is already handling an event and cannot be re-entered by '{event_name}'")]
    ListenerBusy {
        handler: String,
        event_name: String,
    },

    #[error("Invalid parameters for listener '{identifier}': {reason}")]
    InvalidListenerParams { identifier: String, reason: String },

    #[error("Attempted to operate on a poisoned event manager component: {component}")]
    DispatcherPoisoned {
        component: String, // e.g., "handlers", "callbacks"
    },
}
