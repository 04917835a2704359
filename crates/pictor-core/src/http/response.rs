use ::http::header::{AsHeaderName, IntoHeaderName, VARY};
use ::http::{HeaderMap, HeaderValue, StatusCode};

use crate::kernel::Shared;
use crate::kernel::error::{Error, Result};
use crate::model::{ErrorModel, Model};

pub type SharedResponse = Shared<Response>;

/// Parse a header value produced by the pipeline
pub(crate) fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::Other(format!("Invalid header value '{}': {}", value, e)))
}

/// The outgoing response, filled in by listeners as the request moves through the pipeline
#[derive(Debug, Clone, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    model: Option<Model>,
    body: Vec<u8>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// First value of a header, if it is visible ASCII
    pub fn header(&self, name: impl AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Replace every value of `name` with `value`
    pub fn set_header(&mut self, name: impl IntoHeaderName, value: &str) -> Result<&mut Self> {
        self.headers.insert(name, header_value(value)?);
        Ok(self)
    }

    /// Add `value` to the Vary header unless it is already listed
    pub fn set_vary(&mut self, value: &'static str) -> &mut Self {
        let current = self.header(VARY).unwrap_or_default().to_string();
        let listed = current
            .split(',')
            .map(str::trim)
            .any(|v| v.eq_ignore_ascii_case(value));

        if !listed {
            let vary = if current.is_empty() {
                HeaderValue::from_static(value)
            } else {
                match HeaderValue::from_str(&format!("{}, {}", current, value)) {
                    Ok(vary) => vary,
                    Err(_) => HeaderValue::from_static(value),
                }
            };
            self.headers.insert(VARY, vary);
        }
        self
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn set_model(&mut self, model: impl Into<Option<Model>>) -> &mut Self {
        self.model = model.into();
        self
    }

    /// Replace the model with an error and adopt its status code
    pub fn set_error(&mut self, error: ErrorModel) -> &mut Self {
        self.status = StatusCode::from_u16(error.http_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.model = Some(Model::Error(error));
        self
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn set_body(&mut self, body: Vec<u8>) -> &mut Self {
        self.body = body;
        self
    }

    /// Status, headers and body, for handing the response to a server
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Vec<u8>) {
        (self.status, self.headers, self.body)
    }
}
