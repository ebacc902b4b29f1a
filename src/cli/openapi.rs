use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use http::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::config::RouterConfig;
use crate::endpoint::{Requirements, SchemaRef};
use crate::module::ModuleRegistry;
use crate::resolver::Resolver;

/// Name of the security scheme attached to operations that require auth.
pub const SECURITY_SCHEME: &str = "FsrouteGenerated";

/// File formats `generate-openapi` can write.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    #[value(alias = "yaml")]
    Yml,
}

impl OutputFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yml => "yml",
        }
    }
}

/// Builds an OpenAPI skeleton from a handler tree and the requirements its modules
/// declare.
///
/// Every route of the tree becomes a path. Operations are filled in for modules present
/// in the registry; a route whose module is not registered is kept without operations.
pub struct OpenApiGenerator {
    base_path: String,
    resolver: Resolver,
}

impl OpenApiGenerator {
    pub fn new(base: &str, handlers: &str, registry: Arc<ModuleRegistry>) -> Result<Self> {
        let config = RouterConfig::new(base, handlers);
        let resolver = Resolver::new(&config, registry)?;
        Ok(Self {
            base_path: resolver.base_path().to_string(),
            resolver,
        })
    }

    /// Generate the document.
    pub fn generate(&self) -> Result<Value> {
        let tag = self.base_path.replace('/', "-");
        let mut paths: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
        let mut schemas = Map::new();
        let mut secured = false;

        for route in self.resolver.routes()? {
            let module = match self
                .resolver
                .loader()
                .load_reference(&route.file_path, &route.import_reference)
            {
                Ok(module) => module,
                Err(e) => {
                    warn!(
                        import_reference = %route.import_reference,
                        error = %e,
                        "Handler module unavailable, path generated without operations"
                    );
                    paths.entry(self.document_path(&route.route)).or_default();
                    continue;
                }
            };

            for (method, entry) in module.methods() {
                let requirements = entry.requirements().cloned().unwrap_or_default();
                let template = requirements
                    .required_route
                    .as_deref()
                    .map_or(route.route.as_str(), |t| t.trim_matches('/'));
                let path = self.document_path(template);
                let operation =
                    self.operation(method, &path, &tag, &requirements, &mut schemas);
                secured |= requirements.auth_required;
                paths
                    .entry(path)
                    .or_default()
                    .insert(method.as_str().to_ascii_lowercase(), operation);
            }
            debug!(
                route = %route.route,
                import_reference = %route.import_reference,
                "Route documented"
            );
        }

        let mut components = Map::new();
        if secured {
            components.insert(
                "securitySchemes".to_string(),
                json!({SECURITY_SCHEME: {"type": "apiKey", "in": "header", "name": "CHANGE-ME"}}),
            );
        }
        if !schemas.is_empty() {
            components.insert("schemas".to_string(), Value::Object(schemas));
        }

        Ok(json!({
            "openapi": "3.1.0",
            "info": {
                "version": "1.0.0",
                "title": "Fsroute Generator",
                "license": {"name": "MIT"},
            },
            "tags": [{"name": tag}],
            "servers": [],
            "paths": paths,
            "components": components,
        }))
    }

    fn document_path(&self, route: &str) -> String {
        match (self.base_path.is_empty(), route.is_empty()) {
            (true, _) => format!("/{route}"),
            (false, true) => format!("/{}", self.base_path),
            (false, false) => format!("/{}/{route}", self.base_path),
        }
    }

    fn operation(
        &self,
        method: &Method,
        path: &str,
        tag: &str,
        requirements: &Requirements,
        schemas: &mut Map<String, Value>,
    ) -> Value {
        let mut parameters = Vec::new();
        for (names, location, required) in [
            (&requirements.required_query, "query", true),
            (&requirements.available_query, "query", false),
            (&requirements.required_headers, "header", true),
            (&requirements.available_headers, "header", false),
        ] {
            for name in names {
                parameters.push(parameter(location, name, required));
            }
        }
        for name in path_params(path) {
            parameters.push(parameter("path", name, true));
        }

        let mut operation = Map::new();
        operation.insert("tags".to_string(), json!([tag]));
        operation.insert("operationId".to_string(), json!(operation_id(method, path)));
        operation.insert("deprecated".to_string(), json!(false));
        if requirements.auth_required {
            operation.insert("security".to_string(), json!([{SECURITY_SCHEME: []}]));
        }
        operation.insert("parameters".to_string(), Value::Array(parameters));
        if let Some(summary) = &requirements.summary {
            operation.insert("summary".to_string(), json!(summary));
        }

        if let Some(body) = &requirements.required_body {
            let name = schema_name(method, path, "request-body");
            let reference = schema_reference(body, name, schemas);
            operation.insert(
                "requestBody".to_string(),
                json!({
                    "required": true,
                    "content": {"application/json": {"schema": {"$ref": reference}}},
                }),
            );
        }
        if let Some(body) = &requirements.required_response {
            let name = schema_name(method, path, "response-body");
            let reference = schema_reference(body, name, schemas);
            operation.insert(
                "responses".to_string(),
                json!({
                    "200": {
                        "description": "OK",
                        "content": {"application/json": {"schema": {"$ref": reference}}},
                    }
                }),
            );
        }
        Value::Object(operation)
    }

    /// Write the document to `output` once per format, merging into existing files.
    ///
    /// With `delete`, paths of an existing file that the handler tree no longer produces
    /// are removed. Returns the files written.
    pub fn write(&self, output: &Path, formats: &[OutputFormat], delete: bool) -> Result<Vec<PathBuf>> {
        let generated = self.generate()?;
        fs::create_dir_all(output)
            .with_context(|| format!("failed to create output directory {}", output.display()))?;

        let mut written = Vec::with_capacity(formats.len());
        let unique: BTreeSet<&'static str> = formats.iter().map(|f| f.extension()).collect();
        for extension in unique {
            let file = output.join(format!("openapi.{extension}"));
            let document = match read_existing(&file)? {
                Some(existing) => merge(existing, &generated, delete),
                None => generated.clone(),
            };
            let rendered = if extension == "json" {
                serde_json::to_string_pretty(&document)?
            } else {
                serde_yaml::to_string(&document)?
            };
            fs::write(&file, rendered)
                .with_context(|| format!("failed to write {}", file.display()))?;
            info!(file = %file.display(), "OpenAPI document written");
            written.push(file);
        }
        Ok(written)
    }
}

fn parameter(location: &str, name: &str, required: bool) -> Value {
    json!({"in": location, "name": name, "required": required, "schema": {"type": "string"}})
}

fn path_params(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter_map(|s| s.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
}

/// `GET /v1/user/{user_id}` → `GetV1UserUserIdFsrouteGenerated`
fn operation_id(method: &Method, path: &str) -> String {
    let mut id = String::new();
    for word in std::iter::once(method.as_str()).chain(words(path)) {
        let lower = word.to_ascii_lowercase();
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            id.push(first.to_ascii_uppercase());
            id.extend(chars);
        }
    }
    id.push_str(SECURITY_SCHEME);
    id
}

/// `POST /v1/user_info` → `post-v1-user-info-request-body`
fn schema_name(method: &Method, path: &str, suffix: &str) -> String {
    let mut name = method.as_str().to_ascii_lowercase();
    for word in words(path) {
        name.push('-');
        name.push_str(&word.to_ascii_lowercase());
    }
    name.push('-');
    name.push_str(suffix);
    name
}

fn schema_reference(schema: &SchemaRef, name: String, schemas: &mut Map<String, Value>) -> String {
    let name = match schema {
        SchemaRef::Component(existing) => existing.clone(),
        SchemaRef::Inline(inline) => {
            schemas.insert(name.clone(), inline.clone());
            name
        }
    };
    format!("#/components/schemas/{name}")
}

fn read_existing(file: &Path) -> Result<Option<Value>> {
    if !file.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let value = if file.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", file.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", file.display()))?
    };
    Ok(Some(value))
}

/// Overlay generated operations and components onto an existing document.
fn merge(mut existing: Value, generated: &Value, delete: bool) -> Value {
    let Some(doc) = existing.as_object_mut() else {
        return generated.clone();
    };

    let generated_paths = generated["paths"].as_object().cloned().unwrap_or_default();
    let paths = doc
        .entry("paths")
        .or_insert_with(|| json!({}));
    if let Some(paths) = paths.as_object_mut() {
        if delete {
            paths.retain(|path, _| generated_paths.contains_key(path));
        }
        for (path, operations) in generated_paths {
            let item = paths.entry(path).or_insert_with(|| json!({}));
            if let (Some(item), Value::Object(operations)) = (item.as_object_mut(), operations) {
                item.extend(operations);
            }
        }
    }

    if let Some(generated_components) = generated["components"].as_object() {
        let components = doc
            .entry("components")
            .or_insert_with(|| json!({}));
        if let Some(components) = components.as_object_mut() {
            for (section, entries) in generated_components {
                let target = components
                    .entry(section.clone())
                    .or_insert_with(|| json!({}));
                if let (Some(target), Some(entries)) = (target.as_object_mut(), entries.as_object())
                {
                    for (name, schema) in entries {
                        target.entry(name.clone()).or_insert_with(|| schema.clone());
                    }
                }
            }
        }
    }
    existing
}
