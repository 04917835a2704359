use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ::http::{Method, StatusCode};
use chrono::Utc;
use serde_json::Value;

use crate::config::ConfigData;
use crate::event::listener::{CallbackSpec, Listener, SharedListener};
use crate::event::manager::EventManager;
use crate::event::{
    ARG_CONFIG, ARG_MANAGER, ARG_OUTPUT_CONVERTER_MANAGER, ARG_REQUEST, ARG_RESPONSE, ARG_TRANSFORMATION_MANAGER, Event,
};
use crate::http::request::Request;
use crate::http::response::{Response, SharedResponse};
use crate::http::response_formatter::{ARG_NO_STRICT, ResponseFormatter};
use crate::http::router::Route;
use crate::image::{OutputConverterManager, TransformationManager};
use crate::kernel::error::Result;
use crate::kernel::{lock, shared};
use crate::model::{ErrorModel, Model, StatusModel};
use crate::testing::{jpeg_blob, png_image};

fn status_model() -> Model {
    Model::Status(StatusModel {
        date: Utc::now(),
        database: true,
        storage: true,
    })
}

fn image_model() -> Model {
    Model::Image(shared(png_image("christer", "abc", 3, 2)))
}

/// Event carrying everything the formatter reads
fn event_for(request: Request, model: Option<Model>, config: ConfigData) -> Result<(Event, SharedResponse, EventManager)> {
    let response = shared(Response::new());
    lock(&response, "response")?.set_model(model);

    let mut template = Event::new();
    template
        .set_argument(ARG_REQUEST, shared(request))
        .set_argument(ARG_RESPONSE, response.clone());

    let manager = EventManager::new();
    manager.set_event_template(template.clone())?;

    let mut event = template;
    event
        .set_argument(ARG_CONFIG, Arc::new(config))
        .set_argument(ARG_OUTPUT_CONVERTER_MANAGER, Arc::new(OutputConverterManager::with_defaults()))
        .set_argument(ARG_TRANSFORMATION_MANAGER, shared(TransformationManager::new()))
        .set_argument(ARG_MANAGER, manager.clone());

    Ok((event, response, manager))
}

fn routed(method: Method, route: Route, accept: Option<&str>) -> Request {
    let mut request = Request::new(method, "/");
    if let Some(accept) = accept {
        request = request.with_header("Accept", accept);
    }
    request.set_route(route);
    request
}

fn negotiated(request: Request, model: Model, config: ConfigData) -> Result<Option<String>> {
    let (mut event, _, _) = event_for(request, Some(model), config)?;
    let mut formatter = ResponseFormatter::new();
    formatter.negotiate(&mut event)?;
    Ok(formatter.formatter().map(str::to_owned))
}

#[test]
fn test_nothing_to_negotiate_without_model() -> Result<()> {
    let (mut event, response, _) = event_for(Request::new(Method::GET, "/"), None, ConfigData::new())?;
    let mut formatter = ResponseFormatter::new();

    formatter.negotiate(&mut event)?;
    formatter.format(&mut event)?;

    assert_eq!(formatter.formatter(), None);
    let response = lock(&response, "response")?;
    assert!(response.body().is_empty());
    assert!(!response.headers().contains_key("Content-Type"));
    Ok(())
}

#[test]
fn test_extension_bypasses_accept_header() -> Result<()> {
    let request = routed(Method::GET, Route::new("status").with("extension", "xml"), Some("application/json"));
    let (mut event, response, _) = event_for(request, Some(status_model()), ConfigData::new())?;
    let mut formatter = ResponseFormatter::new();
    formatter.negotiate(&mut event)?;

    assert_eq!(formatter.formatter(), Some("xml"));
    assert!(!lock(&response, "response")?.headers().contains_key("Vary"));
    Ok(())
}

#[test]
fn test_accept_header_negotiation() -> Result<()> {
    let request = routed(Method::GET, Route::new("status"), Some("application/xml, application/json;q=0.5"));
    let (mut event, response, _) = event_for(request, Some(status_model()), ConfigData::new())?;
    let mut formatter = ResponseFormatter::new();
    formatter.negotiate(&mut event)?;

    assert_eq!(formatter.formatter(), Some("xml"));
    assert_eq!(lock(&response, "response")?.header("Vary"), Some("Accept"));

    let request = routed(Method::GET, Route::new("status"), None);
    assert_eq!(negotiated(request, status_model(), ConfigData::new())?.as_deref(), Some("json"));
    Ok(())
}

#[test]
fn test_strict_and_non_strict_negotiation() -> Result<()> {
    let request = routed(Method::GET, Route::new("status"), Some("image/png"));
    let (mut event, _, _) = event_for(request, Some(status_model()), ConfigData::new())?;
    let mut formatter = ResponseFormatter::new();

    let error = formatter.negotiate(&mut event).unwrap_err();
    assert_eq!(error.status_code(), 406);

    event.set_argument(ARG_NO_STRICT, true);
    formatter.negotiate(&mut event)?;
    assert_eq!(formatter.formatter(), Some("json"));
    Ok(())
}

#[test]
fn test_error_on_image_route_ignores_extension() -> Result<()> {
    let route = Route::new("image")
        .with("user", "christer")
        .with("imageIdentifier", "abc")
        .with("extension", "png");
    let error = Model::Error(ErrorModel::new(404, "Image not found"));

    let request = routed(Method::GET, route.clone(), Some("application/xml"));
    assert_eq!(negotiated(request, error.clone(), ConfigData::new())?.as_deref(), Some("xml"));

    // Other routes keep honouring the extension
    let request = routed(Method::GET, Route::new("status").with("extension", "xml"), Some("application/json"));
    assert_eq!(negotiated(request, error, ConfigData::new())?.as_deref(), Some("xml"));
    Ok(())
}

#[test]
fn test_unknown_image_extension_is_not_found() -> Result<()> {
    let route = Route::new("image").with("user", "christer").with("extension", "bmp");
    let request = routed(Method::GET, route, None);

    let error = negotiated(request, image_model(), ConfigData::new()).unwrap_err();
    assert_eq!(error.status_code(), 404);
    Ok(())
}

#[test]
fn test_image_extension_selects_converter() -> Result<()> {
    let route = Route::new("image").with("user", "christer").with("extension", "gif");
    let request = routed(Method::GET, route, Some("application/json"));
    assert_eq!(negotiated(request, image_model(), ConfigData::new())?.as_deref(), Some("gif"));
    Ok(())
}

#[test]
fn test_original_mime_type_is_preferred() -> Result<()> {
    let request = routed(Method::GET, Route::new("image"), Some("*/*"));
    assert_eq!(negotiated(request, image_model(), ConfigData::new())?.as_deref(), Some("png"));

    let request = routed(Method::GET, Route::new("image"), Some("image/*"));
    assert_eq!(negotiated(request, image_model(), ConfigData::new())?.as_deref(), Some("png"));

    let request = routed(Method::GET, Route::new("image"), Some("image/gif, image/*;q=0.5"));
    assert_eq!(negotiated(request, image_model(), ConfigData::new())?.as_deref(), Some("gif"));
    Ok(())
}

#[test]
fn test_image_negotiation_can_be_disabled() -> Result<()> {
    let mut config = ConfigData::new();
    config.set("contentNegotiateImages", false)?;

    let request = routed(Method::GET, Route::new("image"), Some("image/gif"));
    assert_eq!(negotiated(request, image_model(), config)?.as_deref(), Some("png"));
    Ok(())
}

#[test]
fn test_format_renders_json_with_headers() -> Result<()> {
    let request = routed(Method::GET, Route::new("status"), None);
    let (mut event, response, _) = event_for(request, Some(status_model()), ConfigData::new())?;
    let mut formatter = ResponseFormatter::new();
    formatter.negotiate(&mut event)?;
    formatter.format(&mut event)?;

    let response = lock(&response, "response")?;
    assert_eq!(response.header("Content-Type"), Some("application/json"));
    let length = response.body().len().to_string();
    assert_eq!(response.header("Content-Length"), Some(length.as_str()));

    let body: Value = serde_json::from_slice(response.body()).expect("valid json");
    assert_eq!(body["database"], Value::Bool(true));
    Ok(())
}

#[test]
fn test_jsonp_wraps_json_only() -> Result<()> {
    let request = routed(Method::GET, Route::new("status"), None).with_query("callback", "handle");
    let (mut event, response, _) = event_for(request, Some(status_model()), ConfigData::new())?;
    let mut formatter = ResponseFormatter::new();
    formatter.set_formatter("json");
    formatter.format(&mut event)?;
    {
        let response = lock(&response, "response")?;
        let body = String::from_utf8_lossy(response.body()).to_string();
        assert!(body.starts_with("handle({"));
        assert!(body.ends_with("})"));
    }

    let request = routed(Method::GET, Route::new("status"), None).with_query("callback", "handle");
    let (mut event, response, _) = event_for(request, Some(status_model()), ConfigData::new())?;
    formatter.set_formatter("xml");
    formatter.format(&mut event)?;
    let response = lock(&response, "response")?;
    assert!(response.body().starts_with(b"<?xml"));
    Ok(())
}

#[test]
fn test_head_request_gets_headers_only() -> Result<()> {
    let request = routed(Method::HEAD, Route::new("status"), None);
    let (mut event, response, _) = event_for(request, Some(status_model()), ConfigData::new())?;
    let mut formatter = ResponseFormatter::new();
    formatter.set_formatter("json");
    formatter.format(&mut event)?;

    let response = lock(&response, "response")?;
    assert!(response.body().is_empty());
    let length: usize = response.header("Content-Length").unwrap_or("0").parse().unwrap();
    assert!(length > 0);
    Ok(())
}

#[test]
fn test_no_content_is_not_rendered() -> Result<()> {
    let request = routed(Method::DELETE, Route::new("status"), None);
    let (mut event, response, _) = event_for(request, Some(status_model()), ConfigData::new())?;
    lock(&response, "response")?.set_status(StatusCode::NO_CONTENT);

    let mut formatter = ResponseFormatter::new();
    formatter.set_formatter("json");
    formatter.format(&mut event)?;

    let response = lock(&response, "response")?;
    assert!(response.body().is_empty());
    assert!(!response.headers().contains_key("Content-Type"));
    Ok(())
}

/// Counts `image.transformed` notifications
struct TransformedCounter(Arc<AtomicUsize>);

impl Listener for TransformedCounter {
    fn handle(&mut self, _method: &str, _event: &mut Event) -> Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[test]
fn test_image_is_converted_to_negotiated_format() -> Result<()> {
    let request = routed(Method::GET, Route::new("image").with("extension", "jpg"), None);
    let (mut event, response, manager) = event_for(request, Some(image_model()), ConfigData::new())?;

    let counter = Arc::new(AtomicUsize::new(0));
    let listener: SharedListener = Arc::new(Mutex::new(TransformedCounter(counter.clone())));
    manager.add_listener_instance("counter", listener, [("image.transformed", CallbackSpec::method("count"))])?;

    let mut formatter = ResponseFormatter::new();
    formatter.negotiate(&mut event)?;
    assert_eq!(formatter.formatter(), Some("jpg"));
    formatter.format(&mut event)?;

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    let response = lock(&response, "response")?;
    assert_eq!(response.header("Content-Type"), Some("image/jpeg"));
    assert!(response.body().starts_with(&[0xFF, 0xD8]));
    Ok(())
}

#[test]
fn test_image_in_original_format_is_sent_untouched() -> Result<()> {
    let model = image_model();
    let original = match &model {
        Model::Image(image) => lock(image, "image")?.blob().to_vec(),
        _ => unreachable!(),
    };

    let request = routed(Method::GET, Route::new("image"), None);
    let (mut event, response, _) = event_for(request, Some(model), ConfigData::new())?;
    let mut formatter = ResponseFormatter::new();
    formatter.negotiate(&mut event)?;
    formatter.format(&mut event)?;

    let response = lock(&response, "response")?;
    assert_eq!(response.header("Content-Type"), Some("image/png"));
    assert_eq!(response.body(), original.as_slice());
    Ok(())
}

#[test]
fn test_compression_reencodes_in_the_same_format() -> Result<()> {
    let original = jpeg_blob(16, 16);
    let mut image = png_image("christer", "abc", 16, 16);
    image
        .set_mime_type("image/jpeg")
        .set_extension("jpg")
        .set_blob(original.clone())
        .set_output_quality(Some(5));

    let request = routed(Method::GET, Route::new("image").with("extension", "jpg"), None);
    let (mut event, response, _) = event_for(request, Some(Model::Image(shared(image))), ConfigData::new())?;
    let mut formatter = ResponseFormatter::new();
    formatter.set_formatter("jpg");
    formatter.format(&mut event)?;

    let response = lock(&response, "response")?;
    assert_eq!(response.header("Content-Type"), Some("image/jpeg"));
    assert!(response.body().starts_with(&[0xFF, 0xD8]));
    assert_ne!(response.body(), original.as_slice());
    Ok(())
}

/// Image model whose stored format has no output converter
fn bitmap_model() -> Result<Model> {
    let model = image_model();
    if let Model::Image(image) = &model {
        lock(image, "image")?.set_mime_type("image/bmp").set_extension("bmp");
    }
    Ok(model)
}

#[test]
fn test_unconvertible_original_is_dropped_after_transformations() -> Result<()> {
    let accept = Some("image/bmp, image/png;q=0.5");

    let request = routed(Method::GET, Route::new("image"), accept);
    assert_eq!(negotiated(request, bitmap_model()?, ConfigData::new())?.as_deref(), Some("bmp"));

    let request = routed(Method::GET, Route::new("image"), accept).with_query("t[]", "flipHorizontally");
    let (mut event, _, _) = event_for(request, Some(image_model()), ConfigData::new())?;
    let transformations = event.transformation_manager()?;
    lock(&*transformations, "transformationManager")?.apply_transformations(&mut event)?;

    // Relabel as a format no converter can produce
    if let Some(Model::Image(image)) = lock(&*event.response()?, "response")?.model() {
        lock(image, "image")?.set_mime_type("image/bmp").set_extension("bmp");
    }

    let mut formatter = ResponseFormatter::new();
    formatter.negotiate(&mut event)?;
    assert_eq!(formatter.formatter(), Some("png"));
    Ok(())
}

fn jsonp_body(query: &[(&str, &str)]) -> Result<String> {
    let mut request = routed(Method::GET, Route::new("status"), None);
    for (key, value) in query {
        request = request.with_query(*key, *value);
    }
    let (mut event, response, _) = event_for(request, Some(status_model()), ConfigData::new())?;
    let mut formatter = ResponseFormatter::new();
    formatter.set_formatter("json");
    formatter.format(&mut event)?;

    let response = lock(&response, "response")?;
    Ok(String::from_utf8_lossy(response.body()).to_string())
}

#[test]
fn test_jsonp_parameter_precedence() -> Result<()> {
    assert!(jsonp_body(&[("json", "j"), ("callback", "c")])?.starts_with("c({"));
    assert!(jsonp_body(&[("json", "j"), ("jsonp", "p")])?.starts_with("p({"));
    assert!(jsonp_body(&[("json", "j")])?.starts_with("j({"));
    assert!(jsonp_body(&[])?.starts_with('{'));
    Ok(())
}
