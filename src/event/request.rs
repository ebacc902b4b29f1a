use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use serde_json::Value;
use smallvec::SmallVec;

use crate::error::ApiError;
use crate::resolver::ParamVec;

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header storage; names are lower-cased on the way in.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// One API Gateway request as seen by hooks and handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Full request path, base path included
    pub path: String,
    /// Request headers with lower-case names
    pub headers: HeaderVec,
    /// Query string parameters
    pub query_params: ParamVec,
    /// Body parsed as JSON; a body that is not JSON is kept as a string, no body is `Null`
    pub body: Value,
    /// Path parameters bound by the route (filled in by the router)
    pub path_params: ParamVec,
    /// Matched route template including the base path, e.g. `v1/user/{user_id}`
    pub route: String,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderVec::new(),
            query_params: ParamVec::new(),
            body: Value::Null,
            path_params: ParamVec::new(),
            route: String::new(),
        }
    }

    /// Parse an API Gateway proxy event.
    ///
    /// Reads `path`, `httpMethod`, `headers`, `queryStringParameters` and `body`. A body
    /// that is valid JSON is parsed; `isBase64Encoded` is not interpreted.
    pub fn from_event(event: &Value) -> Result<Self, ApiError> {
        let path = event
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::new(400, "path", "event has no path"))?;
        let method = event
            .get("httpMethod")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::new(400, "httpMethod", "event has no httpMethod"))?;
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| ApiError::new(400, "httpMethod", format!("invalid method {method}")))?;

        let mut request = Request::new(method, path);
        for (name, value) in string_pairs(event.get("headers")) {
            request.set_header(&name, value);
        }
        for (name, value) in string_pairs(event.get("queryStringParameters")) {
            request.query_params.push((Arc::from(name.as_str()), value));
        }
        request.body = match event.get("body") {
            Some(Value::String(raw)) => parse_body(raw),
            Some(other) => other.clone(),
            None => Value::Null,
        };
        Ok(request)
    }

    /// Path split on `/`, without the leading separator.
    ///
    /// A trailing slash yields a trailing empty segment, which resolves to a directory index.
    #[must_use]
    pub fn path_segments(&self) -> Vec<&str> {
        self.path.trim_start_matches('/').split('/').collect()
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value.into());
        self
    }

    #[must_use]
    pub fn with_query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query_params.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Add or replace a header.
    pub fn set_header(&mut self, name: &str, value: String) {
        let name = name.to_ascii_lowercase();
        self.headers.retain(|(k, _)| k.as_ref() != name);
        self.headers.push((Arc::from(name), value));
    }

    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name (last write wins)
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a path parameter by name (last write wins)
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Path parameters as a map; allocates.
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

fn string_pairs(value: Option<&Value>) -> Vec<(String, String)> {
    let Some(Value::Object(map)) = value else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                Value::Null => return None,
                other => other.to_string(),
            };
            Some((k.clone(), v))
        })
        .collect()
}

fn parse_body(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
