//! HTTP request type and captured route parameters.

use std::collections::HashMap;

use crate::binding::Entity;
use crate::url::percent_decode;

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method
    Get,
    /// POST method
    Post,
    /// PUT method
    Put,
    /// PATCH method
    Patch,
    /// DELETE method
    Delete,
    /// HEAD method
    Head,
    /// OPTIONS method
    Options,
}

impl Method {
    /// Every method, in the order `Allow` headers list them.
    pub const ALL: [Self; 7] = [
        Self::Get,
        Self::Head,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Delete,
        Self::Options,
    ];

    /// Parses a method from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    /// Returns the method as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The value captured for one placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// A raw (percent-decoded) path or host segment.
    Raw(String),
    /// A raw value that the binding resolver turned into an entity.
    Bound {
        /// The segment as it appeared in the request.
        raw: String,
        /// What the resolver returned for it.
        entity: Entity,
    },
    /// An optional placeholder the request did not supply.
    Absent,
}

impl ParamValue {
    /// The raw string, if the parameter was supplied.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Raw(raw) | Self::Bound { raw, .. } => Some(raw),
            Self::Absent => None,
        }
    }

    /// The bound entity, if the parameter went through the resolver.
    pub fn entity(&self) -> Option<&Entity> {
        match self {
            Self::Bound { entity, .. } => Some(entity),
            _ => None,
        }
    }

    /// Returns `true` for an optional placeholder that was not supplied.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Parameters extracted from the URL, in the order the pattern declares them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathParams {
    params: Vec<(String, ParamValue)>,
}

impl PathParams {
    /// Creates new empty path params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a raw parameter value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key.into(), ParamValue::Raw(value.into()));
    }

    /// Records an optional parameter as not supplied.
    pub fn insert_absent(&mut self, key: impl Into<String>) {
        self.set(key.into(), ParamValue::Absent);
    }

    /// Replaces the value of `key`, keeping its position, or appends it.
    pub fn set(&mut self, key: String, value: ParamValue) {
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.params.push((key, value)),
        }
    }

    /// Gets a raw parameter value. Absent optionals yield `None`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(ParamValue::as_str)
    }

    /// Gets the full captured value, including the absent marker.
    pub fn value(&self, key: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Gets the entity bound to a parameter.
    pub fn entity(&self, key: &str) -> Option<&Entity> {
        self.value(key).and_then(ParamValue::entity)
    }

    /// Returns `true` if the pattern declared `key`, supplied or not.
    pub fn contains(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    /// Parses a parameter as a specific type.
    pub fn parse<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Returns an iterator over the parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared parameters, absent ones included.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` when the route declared no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// An HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Host the request was addressed to, if known.
    pub host: Option<String>,
    /// Request path, without the query string.
    pub path: String,
    /// Path parameters extracted from URL patterns.
    pub params: PathParams,
    /// Query string parameters.
    pub query: HashMap<String, String>,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Vec<u8>,
}

impl Request {
    /// Creates a new request.
    ///
    /// A query string left on `path` is split off into [`Request::query`].
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let mut path = path.into();
        let mut query = HashMap::new();
        if let Some(idx) = path.find('?') {
            query = Self::parse_query_string(&path[idx + 1..]);
            path.truncate(idx);
        }
        Self {
            method,
            host: None,
            path,
            params: PathParams::new(),
            query,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Creates a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Creates a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Sets the host the request is addressed to.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Gets a header value.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        // Case-insensitive header lookup
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Gets a query parameter.
    pub fn get_query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// The host to match domain routes against: the explicit host, else the
    /// `Host` header.
    pub fn effective_host(&self) -> Option<&str> {
        self.host.as_deref().or_else(|| self.get_header("Host"))
    }

    /// Parses query parameters from a query string.
    pub fn parse_query_string(query: &str) -> HashMap<String, String> {
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| {
                let mut parts = pair.splitn(2, '=');
                let key = parts.next()?;
                let value = parts.next().unwrap_or("");
                Some((percent_decode(key, true), percent_decode(value, true)))
            })
            .collect()
    }
}
