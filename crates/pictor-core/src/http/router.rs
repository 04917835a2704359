use std::collections::HashMap;

use ::http::Method;
use regex::Regex;

use crate::kernel::error::{Error, Result};

/// HTTP methods the router lets through
const SUPPORTED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::HEAD,
    Method::DELETE,
    Method::OPTIONS,
];

/// Built-in routes, tried in order
const ROUTES: [(&str, &str); 10] = [
    (
        "image",
        r"^/users/(?P<user>[a-z0-9_-]{1,})/images/(?P<imageIdentifier>[A-Za-z0-9_-]{1,255})(\.(?P<extension>gif|jpe?g|png|webp|bmp|tiff?))?$",
    ),
    ("status", r"^/status(/|(\.(?P<extension>json|xml)))?$"),
    (
        "images",
        r"^/users/(?P<user>[a-z0-9_-]{1,})/images(/|(\.(?P<extension>json|xml)))?$",
    ),
    (
        "metadata",
        r"^/users/(?P<user>[a-z0-9_-]{1,})/images/(?P<imageIdentifier>[A-Za-z0-9_-]{1,255})/meta(?:data)?(/|\.(?P<extension>json|xml))?$",
    ),
    ("user", r"^/users/(?P<user>[a-z0-9_-]{1,})(/|\.(?P<extension>json|xml))?$"),
    ("stats", r"^/stats(/|(\.(?P<extension>json|xml)))?$"),
    ("groups", r"^/groups(/|(\.(?P<extension>json|xml)))?$"),
    ("group", r"^/groups/(?P<group>[a-z0-9_-]{1,})(/|\.(?P<extension>json|xml))?$"),
    (
        "accessrules",
        r"^/keys/(?P<publickey>[a-z0-9_-]{1,})/access(/|(\.(?P<extension>json|xml)))?$",
    ),
    (
        "accessrule",
        r"^/keys/(?P<publickey>[a-z0-9_-]{1,})/access/(?P<accessRuleId>[0-9]{1,})(\.(?P<extension>json|xml))?$",
    ),
];

/// A matched route: its name and the named captures of its pattern
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    name: String,
    params: HashMap<String, String>,
}

impl Route {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: HashMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }
}

/// Maps a method and a path onto a [`Route`]
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<(String, Regex)>,
}

impl Router {
    pub fn new() -> Result<Self> {
        let routes = ROUTES
            .iter()
            .map(|(name, pattern)| {
                Regex::new(pattern)
                    .map(|regex| (name.to_string(), regex))
                    .map_err(|e| Error::Config(format!("Invalid route pattern for '{}': {}", name, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { routes })
    }

    /// Route a request. Unknown methods give 501, unknown paths 404.
    pub fn route(&self, method: &Method, path: &str) -> Result<Route> {
        if method.as_str() == "BREW" {
            return Err(Error::http(418, "I'm a teapot!"));
        }

        if !SUPPORTED_METHODS.contains(method) {
            return Err(Error::http(501, format!("Unsupported HTTP method: {}", method)));
        }

        for (name, regex) in &self.routes {
            let Some(captures) = regex.captures(path) else {
                continue;
            };

            let mut route = Route::new(name.clone());
            for group in regex.capture_names().flatten() {
                if let Some(value) = captures.name(group) {
                    route.set(group, value.as_str());
                }
            }
            return Ok(route);
        }

        Err(Error::not_found())
    }
}
