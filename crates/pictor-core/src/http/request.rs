use std::collections::HashMap;

use ::http::header::{ACCEPT, AsHeaderName};
use ::http::{HeaderMap, HeaderName, HeaderValue, Method};
use log::warn;

use crate::http::router::Route;
use crate::kernel::Shared;

/// Header carrying the public key of the caller
pub const PUBLIC_KEY_HEADER: &str = "x-pictor-publickey";

pub type SharedRequest = Shared<Request>;

/// A transformation asked for through the `t` query parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedTransformation {
    pub name: String,
    pub params: HashMap<String, String>,
}

impl RequestedTransformation {
    /// Parse `name` or `name:key=value,key=value`. Values may contain commas
    /// as long as what follows the comma does not look like `key=`.
    pub fn parse(raw: &str) -> Self {
        let (name, raw_params) = match raw.split_once(':') {
            Some((name, params)) => (name, params),
            None => (raw, ""),
        };

        let mut pieces: Vec<String> = Vec::new();
        for piece in raw_params.split(',') {
            match pieces.last_mut() {
                Some(last) if !Self::starts_with_key(piece) => {
                    last.push(',');
                    last.push_str(piece);
                }
                _ => pieces.push(piece.to_string()),
            }
        }

        let params = pieces
            .iter()
            .filter_map(|piece| piece.split_once('='))
            .filter(|(key, value)| !key.is_empty() && !value.is_empty())
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Self {
            name: name.to_string(),
            params,
        }
    }

    fn starts_with_key(piece: &str) -> bool {
        match piece.split_once('=') {
            Some((key, _)) => !key.is_empty() && key.chars().all(|c| c.is_alphanumeric() || c == '_'),
            None => false,
        }
    }
}

/// An inbound HTTP request as the pipeline sees it.
///
/// Query parameters arrive already decoded. Route information is attached
/// by the router once the path has been matched.
#[derive(Debug, Clone, Default)]
pub struct Request {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Vec<u8>,
    route: Option<Route>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_query_pairs(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Append a header. Invalid names or values are dropped with a warning.
    pub fn with_header<K, V>(mut self, name: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<::http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<::http::Error>,
    {
        let name: Result<HeaderName, ::http::Error> = HeaderName::try_from(name).map_err(Into::into);
        let value: Result<HeaderValue, ::http::Error> = HeaderValue::try_from(value).map_err(Into::into);
        match (name, value) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            (Err(e), _) | (_, Err(e)) => warn!("Ignoring invalid request header: {}", e),
        }
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if it is visible ASCII
    pub fn header(&self, name: impl AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The Accept header, `*/*` when the client sent none
    pub fn accept(&self) -> &str {
        self.header(ACCEPT).unwrap_or("*/*")
    }

    pub fn has_query_param(&self, name: &str) -> bool {
        self.query_param(name).is_some()
    }

    /// First value of a query parameter
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every value given as `name` or `name[]`
    pub fn query_values(&self, name: &str) -> Vec<&str> {
        let list_name = format!("{}[]", name);
        self.query
            .iter()
            .filter(|(key, _)| key == name || *key == list_name)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn transformations(&self) -> Vec<RequestedTransformation> {
        self.query_values("t")
            .into_iter()
            .map(RequestedTransformation::parse)
            .collect()
    }

    pub fn set_route(&mut self, route: Route) {
        self.route = Some(route);
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    /// Name of the matched route, empty before routing
    pub fn route_name(&self) -> &str {
        self.route.as_ref().map(Route::name).unwrap_or_default()
    }

    pub fn user(&self) -> Option<&str> {
        self.route.as_ref().and_then(|route| route.get("user"))
    }

    pub fn image_identifier(&self) -> Option<&str> {
        self.route.as_ref().and_then(|route| route.get("imageIdentifier"))
    }

    pub fn extension(&self) -> Option<&str> {
        self.route.as_ref().and_then(|route| route.get("extension"))
    }

    /// Header first, then the `publicKey` query parameter, then the route user
    pub fn public_key(&self) -> Option<&str> {
        self.header(PUBLIC_KEY_HEADER)
            .filter(|key| !key.is_empty())
            .or_else(|| self.query_param("publicKey").filter(|key| !key.is_empty()))
            .or_else(|| self.user())
    }
}
