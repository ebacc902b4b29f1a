use std::path::Path;

use anyhow::{Context, Result};
use http::Method;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::config::OpenApiSource;

/// A parameter an operation declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    /// `query`, `header`, `path` or `cookie`
    pub location: String,
    pub required: bool,
}

/// A loaded OpenAPI document.
///
/// Only the parts request routing needs are interpreted: `paths` with their operations'
/// `parameters`, `requestBody`, `responses` and `security`, the document-level
/// `security`, and `components`, which schemas may reference with
/// `#/components/schemas/<name>`.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenApiDocument {
    doc: Value,
}

impl OpenApiDocument {
    /// Load from a config source. Files ending in `.json` are parsed as JSON, anything
    /// else as YAML.
    pub fn load(source: &OpenApiSource) -> Result<Self> {
        match source {
            OpenApiSource::Document(map) => Ok(Self::from_value(Value::Object(map.clone()))),
            OpenApiSource::Path(path) => Self::from_file(path),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read OpenAPI document {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let doc: Value = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse OpenAPI JSON {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("failed to parse OpenAPI YAML {}", path.display()))?
        };
        let document = Self::from_value(doc);
        info!(
            path = %path.display(),
            paths = document.paths().map_or(0, Map::len),
            "OpenAPI document loaded"
        );
        Ok(document)
    }

    #[must_use]
    pub fn from_value(doc: Value) -> Self {
        Self { doc }
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.doc
    }

    #[must_use]
    pub fn paths(&self) -> Option<&Map<String, Value>> {
        self.doc.get("paths").and_then(Value::as_object)
    }

    fn path_item(&self, path: &str) -> Option<&Value> {
        let paths = self.paths()?;
        let with_slash = format!("/{}", path.trim_start_matches('/'));
        paths.get(&with_slash).or_else(|| paths.get(path))
    }

    /// The operation for `method` on `path` (a template such as `/v1/user/{user_id}`).
    #[must_use]
    pub fn operation(&self, path: &str, method: &Method) -> Option<&Value> {
        self.path_item(path)?
            .get(method.as_str().to_ascii_lowercase())
    }

    #[must_use]
    pub fn has_path(&self, path: &str) -> bool {
        self.path_item(path).is_some()
    }

    /// Path-level and operation-level parameters; operation entries override path ones.
    #[must_use]
    pub fn parameters(&self, path: &str, method: &Method) -> Vec<ParameterSpec> {
        let mut out: Vec<ParameterSpec> = Vec::new();
        let item_params = self.path_item(path).and_then(|i| i.get("parameters"));
        let op_params = self.operation(path, method).and_then(|o| o.get("parameters"));
        for params in [item_params, op_params].into_iter().flatten() {
            let Some(params) = params.as_array() else {
                continue;
            };
            for param in params {
                let param = self.deref(param);
                let (Some(name), Some(location)) = (
                    param.get("name").and_then(Value::as_str),
                    param.get("in").and_then(Value::as_str),
                ) else {
                    continue;
                };
                let spec = ParameterSpec {
                    name: name.to_string(),
                    location: location.to_string(),
                    required: location == "path"
                        || param.get("required").and_then(Value::as_bool) == Some(true),
                };
                out.retain(|p| !(p.name == spec.name && p.location == spec.location));
                out.push(spec);
            }
        }
        out
    }

    /// Request body schema and whether a body is required.
    #[must_use]
    pub fn request_body(&self, path: &str, method: &Method) -> Option<(bool, Option<Value>)> {
        let body = self.deref(self.operation(path, method)?.get("requestBody")?);
        let required = body.get("required").and_then(Value::as_bool).unwrap_or(false);
        Some((required, json_schema(body)))
    }

    /// Response body schema for `status`, falling back to `default`.
    #[must_use]
    pub fn response_schema(&self, path: &str, method: &Method, status: u16) -> Option<Value> {
        let responses = self.operation(path, method)?.get("responses")?;
        let response = responses
            .get(status.to_string())
            .or_else(|| responses.get("default"))?;
        json_schema(self.deref(response))
    }

    /// Whether the operation declares (or inherits) a non-empty security requirement.
    #[must_use]
    pub fn has_security(&self, path: &str, method: &Method) -> bool {
        let Some(operation) = self.operation(path, method) else {
            return false;
        };
        let security = operation.get("security").or_else(|| self.doc.get("security"));
        security
            .and_then(Value::as_array)
            .is_some_and(|reqs| !reqs.is_empty())
    }

    /// Schema document for a component schema name, with `components` embedded so
    /// nested `$ref`s resolve.
    #[must_use]
    pub fn component_schema(&self, name: &str) -> Option<Value> {
        let components = self.doc.get("components")?;
        components.get("schemas")?.get(name)?;
        Some(json!({
            "$ref": format!("#/components/schemas/{name}"),
            "components": components,
        }))
    }

    /// Make a schema taken from this document self-contained by embedding `components`.
    #[must_use]
    pub fn embed_components(&self, schema: &Value) -> Value {
        let mut schema = schema.clone();
        if let (Value::Object(map), Some(components)) = (&mut schema, self.doc.get("components")) {
            map.entry("components")
                .or_insert_with(|| components.clone());
        }
        schema
    }

    /// Follow a local `$ref` such as `#/components/requestBodies/Basic`.
    fn deref<'a>(&'a self, value: &'a Value) -> &'a Value {
        let Some(reference) = value.get("$ref").and_then(Value::as_str) else {
            return value;
        };
        reference
            .strip_prefix('#')
            .and_then(|pointer| self.doc.pointer(pointer))
            .unwrap_or(value)
    }
}

fn json_schema(with_content: &Value) -> Option<Value> {
    let content = with_content.get("content")?.as_object()?;
    content
        .get("application/json")
        .or_else(|| content.values().next())?
        .get("schema")
        .cloned()
}
