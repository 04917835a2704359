//! # Logging for the Pictor server
//!
//! Installs a `tracing` subscriber for the process, bridges the `log`
//! records emitted by `pictor-core`, and provides an `event-logger`
//! listener that traces every event flowing through the pipeline.
use std::any::Any;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use log::Level;
use pictor_core::event::listener::{CallbackSpec, Initializer, Listener, ListenerCatalog, SharedListener, Subscriptions, parse_params};
use pictor_core::{Application, Error, Event, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Catalog identifier of [`EventLogger`]
pub const EVENT_LOGGER: &str = "event-logger";

/// Output format of the subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// The `logging` configuration section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directives used when `RUST_LOG` is not set
    pub level: String,
    pub format: LogFormat,
    /// Level forced onto every event logger, e.g. `"info"`
    #[serde(rename = "eventLevel")]
    pub event_level: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            event_level: None,
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `config.level`.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    tracing_log::LogTracer::init().map_err(|e| Error::Other(format!("Failed to bridge log records: {}", e)))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", config.level, e)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };
    installed.map_err(|e| Error::Other(format!("Failed to install log subscriber: {}", e)))?;

    tracing::debug!(format = ?config.format, level = %config.level, "Logging initialized");
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
struct EventLoggerParams {
    #[serde(default)]
    level: Option<String>,
}

/// Logs the name of every triggered event along with the request line.
#[derive(Debug, Clone)]
pub struct EventLogger {
    level: Level,
}

impl Default for EventLogger {
    fn default() -> Self {
        Self { level: Level::Debug }
    }
}

impl EventLogger {
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn set_level(&mut self, level: Level) {
        self.level = level;
    }

    fn from_params(params: &Value) -> Result<Self> {
        let params: EventLoggerParams = parse_params(EVENT_LOGGER, params)?;
        match params.level {
            None => Ok(Self::default()),
            Some(level) => parse_level(&level).map(Self::new),
        }
    }

    fn subscriptions() -> Subscriptions {
        vec![("*".to_string(), CallbackSpec::prioritized("log", 1000))]
    }
}

impl Listener for EventLogger {
    fn handle(&mut self, _method: &str, event: &mut Event) -> Result<()> {
        let name = event.name().unwrap_or("<unnamed>").to_string();
        let request = event.request()?;
        let request = pictor_core::kernel::lock(&request, "request")?;
        log::log!(target: "pictor::events", self.level, "{} {} -> {}", request.method(), request.path(), name);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Forces one level onto every [`EventLogger`] the pipeline constructs
#[derive(Debug, Clone, Copy)]
pub struct LoggingInitializer {
    level: Level,
}

impl LoggingInitializer {
    pub fn new(level: Level) -> Self {
        Self { level }
    }
}

impl Initializer for LoggingInitializer {
    fn initialize(&self, listener: &mut dyn Listener) -> Result<()> {
        if let Some(logger) = listener.as_any_mut().downcast_mut::<EventLogger>() {
            logger.set_level(self.level);
        }
        Ok(())
    }
}

/// Make [`EventLogger`] available to the `eventListeners` configuration
pub fn register(catalog: &mut ListenerCatalog) {
    catalog.register_with(EVENT_LOGGER, EventLogger::subscriptions(), |params| {
        let listener: SharedListener = Arc::new(Mutex::new(EventLogger::from_params(params)?));
        Ok(listener)
    });
}

fn parse_level(level: &str) -> Result<Level> {
    Level::from_str(level).map_err(|_| Error::Config(format!("Unknown log level '{}'", level)))
}

/// Register the event logger with `application` and apply `config.event_level`
pub fn install(application: &mut Application, config: &LoggingConfig) -> Result<()> {
    register(application.catalog_mut());
    if let Some(level) = &config.event_level {
        application.add_initializer(Arc::new(LoggingInitializer::new(parse_level(level)?)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pictor_core::Method;
    use pictor_core::http::Request;
    use pictor_core::kernel::shared;
    use pictor_core::event::ARG_REQUEST;
    use serde_json::json;

    #[test]
    fn test_logging_config_defaults() {
        let config: LoggingConfig = serde_json::from_value(json!({"format": "json"})).unwrap();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(LoggingConfig::default().format, LogFormat::Text);
    }

    #[test]
    fn test_event_logger_params() {
        assert_eq!(EventLogger::from_params(&Value::Null).unwrap().level(), Level::Debug);
        assert_eq!(EventLogger::from_params(&json!({"level": "warn"})).unwrap().level(), Level::Warn);
        assert!(EventLogger::from_params(&json!({"level": "loud"})).is_err());
    }

    #[test]
    fn test_register_adds_wildcard_listener() {
        let mut catalog = ListenerCatalog::new();
        register(&mut catalog);

        assert!(catalog.contains(EVENT_LOGGER));
        let subscriptions = catalog.subscriptions(EVENT_LOGGER).unwrap();
        assert_eq!(subscriptions[0].0, "*");
        assert!(catalog.construct(EVENT_LOGGER, &json!({"level": "trace"})).is_ok());
    }

    #[test]
    fn test_install_rejects_unknown_event_level() {
        let config = pictor_core::ConfigData::new();
        let mut application = Application::from_config(config).unwrap();
        let logging = LoggingConfig {
            event_level: Some("chatty".to_string()),
            ..LoggingConfig::default()
        };

        assert!(install(&mut application, &logging).is_err());
        assert!(install(&mut application, &LoggingConfig::default()).is_ok());
    }

    #[test]
    fn test_initializer_sets_level() {
        let mut logger = EventLogger::default();
        LoggingInitializer::new(Level::Info).initialize(&mut logger).unwrap();
        assert_eq!(logger.level(), Level::Info);
    }

    #[test]
    fn test_event_logger_handles_events() {
        let mut event = Event::new();
        event.set_argument(ARG_REQUEST, shared(Request::new(Method::GET, "/status")));

        let mut logger = EventLogger::default();
        assert!(logger.handle("log", &mut event).is_ok());
    }
}
