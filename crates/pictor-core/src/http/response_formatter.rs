//! # Response formatting
//!
//! [`ResponseFormatter`] is the listener that decides what representation a
//! response gets and renders it.
//!
//! - On `response.negotiate` it picks a formatter identifier: `json`, `xml` or
//!   an image extension. An explicit URL extension wins over the Accept
//!   header, except for error models on image routes, which would otherwise
//!   be rendered as image bytes.
//! - On `response.send` it renders the model with that formatter, converting
//!   images when the negotiated format differs from the stored one, and sets
//!   `Content-Type` and `Content-Length`.
//!
//! Negotiation is strict by default and fails with 406 when nothing the
//! client accepts can be produced. When the event carries a `noStrict`
//! argument it falls back to the default mime type instead.
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use ::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use ::http::{HeaderValue, Method, StatusCode};
use log::{debug, trace};
use serde_json::Value;

use crate::event::error::EventSystemError;
use crate::event::listener::{CallbackSpec, Listener, ListenerDefinition, Subscriptions};
use crate::event::{Arguments, Event, argument};
use crate::http::formatter::{Formatter, JsonFormatter, XmlFormatter};
use crate::http::negotiation::{AcceptHeader, ContentNegotiation};
use crate::kernel::constants::{DEFAULT_MIME_TYPE, IMAGE_ROUTES, JSONP_PARAMS};
use crate::kernel::error::{Error, Result};
use crate::kernel::lock;
use crate::listener::ARG_IMAGE;
use crate::model::Model;

/// Event argument switching negotiation to non-strict mode
pub const ARG_NO_STRICT: &str = "noStrict";

/// Picks and applies the representation of every response.
#[derive(Clone)]
pub struct ResponseFormatter {
    formatters: Vec<(String, Arc<dyn Formatter>)>,
    content_negotiation: ContentNegotiation,
    formatter: Option<String>,
}

impl fmt::Debug for ResponseFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let identifiers: Vec<&str> = self.formatters.iter().map(|(id, _)| id.as_str()).collect();
        f.debug_struct("ResponseFormatter")
            .field("formatters", &identifiers)
            .field("formatter", &self.formatter)
            .finish()
    }
}

impl Default for ResponseFormatter {
    fn default() -> Self {
        Self::with_formatters(vec![
            ("json".to_string(), Arc::new(JsonFormatter::new()) as Arc<dyn Formatter>),
            ("xml".to_string(), Arc::new(XmlFormatter::new()) as Arc<dyn Formatter>),
        ])
    }
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

/// Append `extra` to `base`, letting later entries override earlier ones
fn merge(mut base: Vec<(String, String)>, extra: &[(String, String)]) -> Vec<(String, String)> {
    for (key, value) in extra {
        match base.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.clone(),
            None => base.push((key.clone(), value.clone())),
        }
    }
    base
}

impl ResponseFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatter set keyed by identifier, in preference order
    pub fn with_formatters(formatters: Vec<(String, Arc<dyn Formatter>)>) -> Self {
        Self {
            formatters,
            content_negotiation: ContentNegotiation::new(),
            formatter: None,
        }
    }

    pub fn set_formatter(&mut self, formatter: impl Into<String>) -> &mut Self {
        self.formatter = Some(formatter.into());
        self
    }

    /// Formatter chosen by the last negotiation
    pub fn formatter(&self) -> Option<&str> {
        self.formatter.as_deref()
    }

    fn extension_to_mime_type(&self) -> Vec<(String, String)> {
        self.formatters
            .iter()
            .map(|(id, formatter)| (id.clone(), formatter.content_type().to_string()))
            .collect()
    }

    fn supported_types(&self) -> Vec<(String, String)> {
        self.formatters
            .iter()
            .map(|(id, formatter)| (formatter.content_type().to_string(), id.clone()))
            .collect()
    }

    /// Candidates for every model kind except images
    fn default_model_types(&self) -> Vec<String> {
        self.formatters
            .iter()
            .map(|(_, formatter)| formatter.content_type().to_string())
            .collect()
    }

    fn text_formatter(&self, identifier: &str) -> Option<&Arc<dyn Formatter>> {
        self.formatters
            .iter()
            .find(|(id, _)| id == identifier)
            .map(|(_, formatter)| formatter)
    }

    /// Choose the formatter for the response of `event`.
    pub fn negotiate(&mut self, event: &mut Event) -> Result<()> {
        let request = event.request()?;
        let response = event.response()?;
        let converters = event.output_converter_manager()?;
        let content_negotiate_images = event.config()?.get_or("contentNegotiateImages", true);

        let mut supported_types = merge(self.supported_types(), converters.mime_to_extension_map());
        let extensions_to_mime_type = merge(self.extension_to_mime_type(), converters.extension_to_mime_map());

        let request = lock(&request, "request")?;
        let mut response = lock(&response, "response")?;

        let model = match response.model() {
            Some(model) => model.clone(),
            None => return Ok(()),
        };
        let image = model.as_image().cloned();
        let extension = request.extension().map(str::to_owned);
        let on_image_route = IMAGE_ROUTES.contains(&request.route_name());

        let formatter = match (&extension, &image) {
            (None, Some(image)) if !content_negotiate_images => lock(image, "image")?.extension().to_string(),
            (Some(extension), _) if !(model.is_error() && on_image_route) => {
                let mime = match lookup(&extensions_to_mime_type, extension) {
                    Some(mime) => mime.to_string(),
                    None if image.is_some() => return Err(Error::not_found()),
                    None => DEFAULT_MIME_TYPE.to_string(),
                };
                lookup(&supported_types, &mime)
                    .ok_or_else(|| Error::Other(format!("No formatter registered for {}", mime)))?
                    .to_string()
            }
            _ => {
                response.set_vary("Accept");
                let acceptable = AcceptHeader::parse(request.accept()).into_acceptable_types();

                let mut types = match &image {
                    Some(_) => converters.supported_mime_types(),
                    None => self.default_model_types(),
                };

                if let Some(image) = &image {
                    let image = lock(image, "image")?;
                    let original = image.mime_type().to_string();

                    if types.first() != Some(&original) {
                        types.retain(|mime| *mime != original);

                        let applied = lock(&*event.transformation_manager()?, "transformationManager")?
                            .has_applied_transformations();
                        if !applied || converters.supports_extension(image.extension()) {
                            types.insert(0, original.clone());
                            supported_types.retain(|(mime, _)| *mime != original);
                            supported_types.push((original, image.extension().to_string()));
                        }
                    }
                }

                trace!("Negotiating {:?} against {:?}", types, acceptable);
                match self.content_negotiation.best_match(&types, &acceptable) {
                    Some(mime) => lookup(&supported_types, &mime).unwrap_or_default().to_string(),
                    None if !event.has_argument(ARG_NO_STRICT) => return Err(Error::not_acceptable()),
                    None => lookup(&supported_types, DEFAULT_MIME_TYPE)
                        .ok_or_else(|| Error::Other(format!("No formatter registered for {}", DEFAULT_MIME_TYPE)))?
                        .to_string(),
                }
            }
        };

        debug!("Negotiated formatter '{}' for {} model", formatter, model.kind());
        self.formatter = Some(formatter);
        Ok(())
    }

    /// Render the response model and attach it to the response.
    pub fn format(&mut self, event: &mut Event) -> Result<()> {
        let request = event.request()?;
        let response = event.response()?;

        let model = {
            let response = lock(&response, "response")?;
            match response.model() {
                Some(model) if response.status() != StatusCode::NO_CONTENT => model.clone(),
                _ => return Ok(()),
            }
        };

        let formatter = match &self.formatter {
            Some(formatter) => formatter.clone(),
            None => lookup(&self.supported_types(), DEFAULT_MIME_TYPE)
                .unwrap_or_default()
                .to_string(),
        };

        let (mut body, content_type) = match &model {
            Model::Image(image) => {
                let converters = event.output_converter_manager()?;
                {
                    let mut image = lock(image, "image")?;
                    let target_mime = converters.mime_type_for_extension(&formatter);
                    let differs = image.extension() != formatter && target_mime != Some(image.mime_type());
                    let compress = image.output_quality().is_some();

                    if (differs || compress) && converters.supports_extension(&formatter) {
                        let target_mime = target_mime.map(str::to_owned);
                        converters.convert(&mut image, &formatter, target_mime.as_deref())?;
                    }
                }

                let mut arguments = Arguments::new();
                arguments.insert(ARG_IMAGE.to_string(), argument(image.clone()));
                event.manager()?.trigger_with("image.transformed", arguments)?;

                let image = lock(image, "image")?;
                (image.blob().to_vec(), image.mime_type().to_string())
            }
            _ => {
                let renderer = self
                    .text_formatter(&formatter)
                    .ok_or_else(|| Error::Other(format!("Unknown formatter: {}", formatter)))?;
                (renderer.format(&model)?.into_bytes(), renderer.content_type().to_string())
            }
        };

        let request = lock(&request, "request")?;
        if content_type == "application/json" {
            if let Some(callback) = JSONP_PARAMS.iter().find_map(|param| request.query_param(param)) {
                let mut wrapped = Vec::with_capacity(body.len() + callback.len() + 2);
                wrapped.extend_from_slice(callback.as_bytes());
                wrapped.push(b'(');
                wrapped.extend_from_slice(&body);
                wrapped.push(b')');
                body = wrapped;
            }
        }

        let mut response = lock(&response, "response")?;
        response.set_header(CONTENT_TYPE, &content_type)?;
        response.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        if *request.method() != Method::HEAD {
            response.set_body(body);
        }

        Ok(())
    }
}

impl Listener for ResponseFormatter {
    fn handle(&mut self, method: &str, event: &mut Event) -> Result<()> {
        match method {
            "negotiate" => self.negotiate(event),
            "format" => self.format(event),
            other => Err(EventSystemError::UnknownMethod {
                handler: Self::IDENTIFIER.to_string(),
                method: other.to_string(),
            }
            .into()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ListenerDefinition for ResponseFormatter {
    const IDENTIFIER: &'static str = "response-formatter";

    fn subscribed_events() -> Subscriptions {
        vec![
            ("response.send".to_string(), CallbackSpec::prioritized("format", 20)),
            ("response.negotiate".to_string(), CallbackSpec::method("negotiate")),
        ]
    }

    fn from_params(_params: &Value) -> Result<Self> {
        Ok(Self::new())
    }
}
