//! # Validator Module
//!
//! Request and response validation for the router pipeline.
//!
//! Two sources of truth are supported:
//!
//! - **Requirements** a handler declares ([`Requirements`]): required and allowed headers
//!   and query parameters, and JSON schemas for the request and response bodies.
//! - **An OpenAPI document** named by the `openapi` config key: the operation matching
//!   the request's route and method supplies the parameters, body schema and response
//!   schema.
//!
//! Problems are reported on the [`Response`] with [`Response::set_error`], so one request
//! can surface every missing header at once. Compiled schemas are cached in a
//! [`SchemaCache`].

mod openapi;
mod schema_cache;
#[cfg(test)]
mod tests;

use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{OpenApiSource, RouterConfig};
use crate::endpoint::{Requirements, SchemaRef};
use crate::error::{ApiError, RouterError};
use crate::event::{Request, Response};

pub use openapi::{OpenApiDocument, ParameterSpec};
pub use schema_cache::SchemaCache;

const HEADERS_KEY: &str = "headers";
const QUERY_KEY: &str = "query_params";

/// Validates requests and responses against handler requirements or an OpenAPI document.
pub struct Validator {
    base_path: String,
    source: Option<OpenApiSource>,
    document: OnceCell<OpenApiDocument>,
    schemas: SchemaCache,
}

impl Validator {
    #[must_use]
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            base_path: config.base_path.trim_matches('/').to_string(),
            source: config.openapi.clone(),
            document: OnceCell::new(),
            schemas: SchemaCache::new(),
        }
    }

    /// Validator over an already loaded document.
    #[must_use]
    pub fn with_document(mut self, document: OpenApiDocument) -> Self {
        self.document = OnceCell::with_value(document);
        self
    }

    #[must_use]
    pub fn schema_cache(&self) -> &SchemaCache {
        &self.schemas
    }

    /// The OpenAPI document, loaded on first call. `None` when none is configured.
    pub fn document(&self) -> Result<Option<&OpenApiDocument>, RouterError> {
        if let Some(document) = self.document.get() {
            return Ok(Some(document));
        }
        let Some(source) = &self.source else {
            return Ok(None);
        };
        self.document
            .get_or_try_init(|| OpenApiDocument::load(source))
            .map(Some)
            .map_err(|e| RouterError::config(format!("{e:#}")))
    }

    /// Load the OpenAPI document up front so a broken file fails at startup.
    pub fn auto_load(&self) -> Result<(), RouterError> {
        if let Some(document) = self.document()? {
            info!(
                paths = document.paths().map_or(0, serde_json::Map::len),
                "OpenAPI document pre-loaded"
            );
        }
        Ok(())
    }

    /// Whether the OpenAPI operation for `request` declares a security requirement.
    ///
    /// `false` without a document or when the document has no such operation.
    #[must_use]
    pub fn request_has_security(&self, request: &Request) -> bool {
        match self.document() {
            Ok(Some(document)) => self
                .operation_path(document, request)
                .is_some_and(|path| document.has_security(&path, &request.method)),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "OpenAPI document unavailable");
                false
            }
        }
    }

    /// Check `request` against the handler's declared requirements.
    pub fn validate_request(
        &self,
        request: &Request,
        response: &mut Response,
        requirements: &Requirements,
    ) {
        for header in &requirements.required_headers {
            if request.get_header(header).is_none() {
                response.set_error(
                    HEADERS_KEY,
                    format!("Please provide {header} in {HEADERS_KEY}"),
                );
            }
        }
        if !requirements.available_headers.is_empty() {
            for (name, _) in &request.headers {
                let allowed = requirements
                    .required_headers
                    .iter()
                    .chain(&requirements.available_headers)
                    .any(|h| h.eq_ignore_ascii_case(name));
                if !allowed {
                    response.set_error(
                        HEADERS_KEY,
                        format!("{name} is not an available {HEADERS_KEY}"),
                    );
                }
            }
        }

        for param in &requirements.required_query {
            if request.get_query_param(param).is_none() {
                response.set_error(QUERY_KEY, format!("Please provide {param} in {QUERY_KEY}"));
            }
        }
        if !requirements.available_query.is_empty() {
            for (name, _) in &request.query_params {
                let allowed = requirements
                    .required_query
                    .iter()
                    .chain(&requirements.available_query)
                    .any(|q| q.as_str() == name.as_ref());
                if !allowed {
                    response.set_error(QUERY_KEY, format!("{name} is not an available {QUERY_KEY}"));
                }
            }
        }

        if let Some(schema) = &requirements.required_body {
            let key = format!("{}:request", request.method);
            self.validate_body(&key, schema, &request.body, response, None);
        }
    }

    /// Check the handler's response body against its `required_response` schema.
    ///
    /// Failures are server errors: the status becomes 500 and key paths start with
    /// `response`.
    pub fn validate_response(
        &self,
        request: &Request,
        response: &mut Response,
        requirements: &Requirements,
    ) {
        if let Some(schema) = &requirements.required_response {
            let key = format!("{}:response", request.method);
            let body = response.body().clone();
            self.validate_body(&key, schema, &body, response, Some("response"));
        }
    }

    /// Check `request` against its OpenAPI operation.
    ///
    /// Required header and query parameters must be present and the JSON body must match
    /// the operation's request body schema. A request with no matching operation is
    /// rejected with 403.
    pub fn validate_request_with_openapi(&self, request: &Request, response: &mut Response) {
        let Some((document, path)) = self.openapi_operation(request, response) else {
            return;
        };

        for param in document.parameters(&path, &request.method) {
            if !param.required {
                continue;
            }
            let missing = match param.location.as_str() {
                "header" => request.get_header(&param.name).is_none(),
                "query" => request.get_query_param(&param.name).is_none(),
                _ => false,
            };
            if missing {
                let key = if param.location == "header" { HEADERS_KEY } else { QUERY_KEY };
                response.set_error(key, format!("Please provide {} in {key}", param.name));
            }
        }

        if let Some((required, schema)) = document.request_body(&path, &request.method) {
            if request.body.is_null() {
                if required {
                    response.set_error("body", "Please provide body in request");
                }
            } else if let Some(schema) = schema {
                let key = format!("openapi:{}:{path}:request", request.method);
                let schema = document.embed_components(&schema);
                self.validate_compiled(&key, &schema, &request.body, response, None);
            }
        }
    }

    /// Check the response body against the OpenAPI response schema for its status code.
    pub fn validate_response_with_openapi(&self, request: &Request, response: &mut Response) {
        let Some((document, path)) = self.openapi_operation(request, response) else {
            return;
        };
        let Some(schema) = document.response_schema(&path, &request.method, response.code())
        else {
            debug!(route = %path, code = response.code(), "No OpenAPI response schema");
            return;
        };
        let key = format!("openapi:{}:{path}:response", request.method);
        let schema = document.embed_components(&schema);
        let body = response.body().clone();
        self.validate_compiled(&key, &schema, &body, response, Some("response"));
    }

    fn openapi_operation(
        &self,
        request: &Request,
        response: &mut Response,
    ) -> Option<(&OpenApiDocument, String)> {
        let document = match self.document() {
            Ok(Some(document)) => document,
            Ok(None) => {
                warn!("OpenAPI validation enabled without an openapi document");
                return None;
            }
            Err(e) => {
                response.set_api_error(&ApiError::from(e));
                return None;
            }
        };
        match self.operation_path(document, request) {
            Some(path) => Some((document, path)),
            None => {
                response.set_api_error(&ApiError::new(403, "method", "method not allowed"));
                None
            }
        }
    }

    /// Document path of the operation serving `request`: the route with the base path
    /// first, then without it.
    fn operation_path(&self, document: &OpenApiDocument, request: &Request) -> Option<String> {
        let route = request.route.trim_matches('/');
        let without_base = if self.base_path.is_empty() {
            route
        } else {
            route
                .strip_prefix(self.base_path.as_str())
                .map_or(route, |rest| rest.trim_start_matches('/'))
        };
        [format!("/{route}"), format!("/{without_base}")]
            .into_iter()
            .find(|path| document.operation(path, &request.method).is_some())
    }

    fn validate_body(
        &self,
        key: &str,
        schema: &SchemaRef,
        body: &Value,
        response: &mut Response,
        prefix: Option<&str>,
    ) {
        let (cache_key, resolved) = match schema {
            SchemaRef::Inline(schema) => {
                let resolved = match self.document() {
                    Ok(Some(document)) => document.embed_components(schema),
                    _ => schema.clone(),
                };
                (format!("inline:{key}:{schema}"), resolved)
            }
            SchemaRef::Component(name) => {
                let component = self
                    .document()
                    .ok()
                    .flatten()
                    .and_then(|document| document.component_schema(name));
                let Some(resolved) = component else {
                    warn!(schema = %name, "Schema not found in OpenAPI components");
                    response.set_api_error(&ApiError::new(
                        500,
                        prefix.unwrap_or("body"),
                        format!("schema {name} not found"),
                    ));
                    return;
                };
                (format!("component:{name}"), resolved)
            }
        };
        self.validate_compiled(&cache_key, &resolved, body, response, prefix);
    }

    fn validate_compiled(
        &self,
        cache_key: &str,
        schema: &Value,
        body: &Value,
        response: &mut Response,
        prefix: Option<&str>,
    ) {
        let Some(validator) = self.schemas.get_or_compile(cache_key, schema) else {
            response.set_api_error(&ApiError::new(
                500,
                prefix.unwrap_or("body"),
                "invalid schema",
            ));
            return;
        };
        let mut failed = false;
        for error in validator.iter_errors(body) {
            failed = true;
            let pointer = error.instance_path().to_string();
            response.set_error(key_path(prefix, &pointer), error.to_string());
        }
        if failed && prefix.is_some() {
            response.set_code(500);
        }
    }
}

/// Error key for a JSON pointer: `/user/name` → `user.name`, the document root → `root`.
/// With a prefix the root is the prefix itself and fields are appended to it.
fn key_path(prefix: Option<&str>, pointer: &str) -> String {
    let dotted = pointer.trim_start_matches('/').replace('/', ".");
    match (prefix, dotted.is_empty()) {
        (None, true) => "root".to_string(),
        (None, false) => dotted,
        (Some(prefix), true) => prefix.to_string(),
        (Some(prefix), false) => format!("{prefix}.{dotted}"),
    }
}
