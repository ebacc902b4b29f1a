//! # Endpoint
//!
//! An [`Endpoint`] is the callable unit the router runs: one handler function of one
//! handler module, for one HTTP method, together with the [`Requirements`] it declared.

use std::fmt;
use std::sync::Arc;

use http::Method;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{Request, Response};
use crate::resolver::ParamVec;

/// Handler function signature.
///
/// A handler fills in the response. Returning an [`ApiError`](crate::ApiError) (through
/// `anyhow`) picks the status code and error body; any other error is a 500.
pub type Handler = Arc<dyn Fn(&Request, &mut Response) -> anyhow::Result<()> + Send + Sync>;

/// Request or response body schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaRef {
    /// Name of a schema under `components/schemas` of the OpenAPI document
    Component(String),
    /// Inline JSON schema
    Inline(Value),
}

/// Contract a handler declares for one method.
///
/// Empty lists mean "no constraint". `available_*` lists are allow-lists: when set, any
/// header or query parameter outside `required_*` and `available_*` is rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirements {
    pub required_headers: Vec<String>,
    pub available_headers: Vec<String>,
    pub required_query: Vec<String>,
    pub available_query: Vec<String>,
    pub required_body: Option<SchemaRef>,
    pub required_response: Option<SchemaRef>,
    pub auth_required: bool,
    /// Route template binding segments after the handler file, e.g. `triple/{x}/{y}/{z}`
    pub required_route: Option<String>,
    pub summary: Option<String>,
    /// Free-form data passed through to hooks
    pub custom: Option<Value>,
}

impl Requirements {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn required_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn available_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn required_query<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_query = params.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn available_query<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available_query = params.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn required_body(mut self, schema: SchemaRef) -> Self {
        self.required_body = Some(schema);
        self
    }

    #[must_use]
    pub fn required_response(mut self, schema: SchemaRef) -> Self {
        self.required_response = Some(schema);
        self
    }

    #[must_use]
    pub fn auth_required(mut self) -> Self {
        self.auth_required = true;
        self
    }

    #[must_use]
    pub fn required_route(mut self, template: impl Into<String>) -> Self {
        self.required_route = Some(template.into());
        self
    }

    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn custom(mut self, custom: Value) -> Self {
        self.custom = Some(custom);
        self
    }
}

/// Compiled `required_route` template.
///
/// `triple/{x}/{y}/{z}` matches `triple/1/2/3` (a trailing slash is tolerated) and binds
/// `x`, `y` and `z` in order.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    template: String,
    regex: Regex,
    params: Vec<Arc<str>>,
}

impl RoutePattern {
    pub fn compile(template: &str) -> Result<Self, regex::Error> {
        let trimmed = template.trim_matches('/');
        let mut pattern = String::with_capacity(trimmed.len() + 8);
        pattern.push('^');
        let mut params = Vec::with_capacity(trimmed.matches('{').count());

        for (i, segment) in trimmed.split('/').enumerate() {
            if i > 0 {
                pattern.push('/');
            }
            if let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                pattern.push_str("([^/]+)");
                params.push(Arc::from(name));
            } else {
                pattern.push_str(&regex::escape(segment));
            }
        }
        pattern.push_str("/?$");

        Ok(Self {
            template: trimmed.to_string(),
            regex: Regex::new(&pattern)?,
            params,
        })
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameters bound by `path` (relative to the base path), or `None` if it does not match.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<ParamVec> {
        let caps = self.regex.captures(path.trim_start_matches('/'))?;
        Some(
            self.params
                .iter()
                .enumerate()
                .filter_map(|(i, name)| {
                    caps.get(i + 1)
                        .map(|m| (Arc::clone(name), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

/// The handler selected for a request.
#[derive(Clone)]
pub struct Endpoint {
    method: Method,
    import_reference: String,
    route: String,
    handler: Handler,
    requirements: Option<Arc<Requirements>>,
    path_params: ParamVec,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.method)
            .field("import_reference", &self.import_reference)
            .field("route", &self.route)
            .field("requirements", &self.requirements)
            .field("path_params", &self.path_params)
            .finish_non_exhaustive()
    }
}

impl Endpoint {
    pub fn new(
        method: Method,
        import_reference: impl Into<String>,
        route: impl Into<String>,
        handler: Handler,
        requirements: Option<Arc<Requirements>>,
    ) -> Self {
        Self {
            method,
            import_reference: import_reference.into(),
            route: route.into(),
            handler,
            requirements,
            path_params: ParamVec::new(),
        }
    }

    #[must_use]
    pub fn with_path_params(mut self, path_params: ParamVec) -> Self {
        self.path_params = path_params;
        self
    }

    /// Parameters bound while resolving the request path.
    #[must_use]
    pub fn path_params(&self) -> &ParamVec {
        &self.path_params
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn import_reference(&self) -> &str {
        &self.import_reference
    }

    /// Route template relative to the base path.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    #[must_use]
    pub fn requirements(&self) -> Option<&Requirements> {
        self.requirements.as_deref()
    }

    #[must_use]
    pub fn has_requirements(&self) -> bool {
        self.requirements.is_some()
    }

    #[must_use]
    pub fn requires_auth(&self) -> bool {
        self.requirements.as_ref().is_some_and(|r| r.auth_required)
    }

    #[must_use]
    pub fn has_required_response(&self) -> bool {
        self.requirements
            .as_ref()
            .is_some_and(|r| r.required_response.is_some())
    }

    /// Invoke the handler.
    pub fn run(&self, request: &Request, response: &mut Response) -> anyhow::Result<()> {
        (self.handler)(request, response)
    }
}
