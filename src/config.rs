//! # Router Configuration
//!
//! [`RouterConfig`] carries everything the router needs besides hooks: where the handler
//! tree lives, the base path stripped from every request, the optional OpenAPI document
//! and the caching, CORS and timeout switches.
//!
//! Configs can be built in code or loaded from a YAML or JSON file:
//!
//! ```yaml
//! base_path: unit-test/v1
//! handlers: src/handlers/**/*_controller.rs
//! openapi: openapi.yml
//! openapi_validate_request: true
//! cache_size: 512
//! cache_mode: static-only
//! ```
//!
//! Loading from a document type-checks the raw values first, so a misconfigured key
//! reports which setting is wrong instead of a generic deserialisation error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RouterError;
use crate::tree::HandlerLayout;

/// Which resolved routes the route cache keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    /// Every route
    #[default]
    All,
    /// Routes without dynamic segments
    StaticOnly,
    /// Routes with at least one dynamic segment
    DynamicOnly,
}

impl CacheMode {
    pub const VALUES: [&'static str; 3] = ["all", "static-only", "dynamic-only"];

    /// Whether a route with the given dynamic flag may be cached.
    #[must_use]
    pub fn admits(self, is_dynamic: bool) -> bool {
        match self {
            CacheMode::All => true,
            CacheMode::StaticOnly => !is_dynamic,
            CacheMode::DynamicOnly => is_dynamic,
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(CacheMode::All),
            "static-only" => Some(CacheMode::StaticOnly),
            "dynamic-only" => Some(CacheMode::DynamicOnly),
            _ => None,
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CacheMode::All => "all",
            CacheMode::StaticOnly => "static-only",
            CacheMode::DynamicOnly => "dynamic-only",
        };
        f.write_str(s)
    }
}

/// Where the OpenAPI document comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpenApiSource {
    /// YAML or JSON file on disk
    Path(PathBuf),
    /// Document given inline
    Document(serde_json::Map<String, Value>),
}

fn default_true() -> bool {
    true
}

/// Router settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Prefix stripped from every request path before resolution
    #[serde(default)]
    pub base_path: String,
    /// Handler glob (`src/handlers/**/*_controller.rs`) or root directory
    #[serde(default)]
    pub handlers: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openapi: Option<OpenApiSource>,
    /// Validate requests against the OpenAPI document instead of handler requirements
    #[serde(default)]
    pub openapi_validate_request: bool,
    #[serde(default)]
    pub openapi_validate_response: bool,
    /// Route cache capacity: `0` is unbounded, `None` disables the cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_size: Option<usize>,
    #[serde(default)]
    pub cache_mode: CacheMode,
    /// Log `request-received` / `request-processed` for every request
    #[serde(default)]
    pub verbose: bool,
    /// Add permissive CORS headers to every response
    #[serde(default = "default_true")]
    pub cors: bool,
    /// Handler deadline in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
    /// Put the text of unhandled errors in the response instead of a generic message
    #[serde(default)]
    pub output_error: bool,
}

impl RouterConfig {
    /// Minimal config with defaults for every optional setting.
    pub fn new(base_path: impl Into<String>, handlers: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            handlers: handlers.into(),
            openapi: None,
            openapi_validate_request: false,
            openapi_validate_response: false,
            cache_size: None,
            cache_mode: CacheMode::All,
            verbose: false,
            cors: true,
            timeout: None,
            output_error: false,
        }
    }

    /// Load a config file; `.json` is parsed as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let value: Value = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse JSON config {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("failed to parse YAML config {}", path.display()))?
        };
        Ok(Self::from_value(value)?)
    }

    /// Type-check a raw config document, then deserialise and validate it.
    pub fn from_value(value: Value) -> Result<Self, RouterError> {
        validate_document(&value)?;
        let config: RouterConfig = serde_json::from_value(value)
            .map_err(|e| RouterError::config(format!("invalid router configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings that types alone do not rule out.
    pub fn validate(&self) -> Result<(), RouterError> {
        if self.base_path.trim().is_empty() {
            return Err(RouterError::config(BASE_PATH_REQUIRED));
        }
        if self.handlers.trim().is_empty() {
            return Err(RouterError::config(HANDLERS_REQUIRED));
        }
        if let Some(OpenApiSource::Path(path)) = &self.openapi {
            if path.as_os_str().is_empty() {
                return Err(RouterError::config(OPENAPI_INVALID));
            }
        }
        if let Some(timeout) = self.timeout {
            if timeout <= 0.0 || Duration::try_from_secs_f64(timeout).is_err() {
                return Err(RouterError::config(TIMEOUT_INVALID));
            }
        }
        Ok(())
    }

    /// Parsed `handlers` setting.
    pub fn layout(&self) -> Result<HandlerLayout, RouterError> {
        HandlerLayout::parse(&self.handlers)
    }

    #[must_use]
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

const BASE_PATH_REQUIRED: &str = "base_path string is required";
const HANDLERS_REQUIRED: &str = "handlers is required; must be glob pattern string";
const OPENAPI_INVALID: &str =
    "openapi should either be file path string or json-schema style dictionary";
const CACHE_SIZE_INVALID: &str =
    "cache_size should be an int (0 for unlimited size) or None (to disable route caching)";
const CACHE_MODE_INVALID: &str =
    "cache_mode should be a string of the one of the following values: all, static-only, dynamic-only";
const TIMEOUT_INVALID: &str = "timeout should be a positive number of seconds";

fn require_bool(doc: &serde_json::Map<String, Value>, key: &str) -> Result<(), RouterError> {
    match doc.get(key) {
        None | Some(Value::Null) | Some(Value::Bool(_)) => Ok(()),
        Some(_) => Err(RouterError::config(format!("{key} should be a boolean"))),
    }
}

fn validate_document(value: &Value) -> Result<(), RouterError> {
    let Value::Object(doc) = value else {
        return Err(RouterError::config(BASE_PATH_REQUIRED));
    };

    match doc.get("base_path") {
        Some(Value::String(s)) if !s.trim().is_empty() => {}
        _ => return Err(RouterError::config(BASE_PATH_REQUIRED)),
    }
    match doc.get("handlers") {
        Some(Value::String(s)) if !s.trim().is_empty() => {}
        _ => return Err(RouterError::config(HANDLERS_REQUIRED)),
    }
    match doc.get("openapi") {
        None | Some(Value::Null) | Some(Value::String(_)) | Some(Value::Object(_)) => {}
        Some(_) => return Err(RouterError::config(OPENAPI_INVALID)),
    }
    require_bool(doc, "openapi_validate_request")?;
    require_bool(doc, "openapi_validate_response")?;
    match doc.get("cache_size") {
        None | Some(Value::Null) => {}
        Some(Value::Number(n)) if n.as_u64().is_some() => {}
        Some(_) => return Err(RouterError::config(CACHE_SIZE_INVALID)),
    }
    match doc.get("cache_mode") {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if CacheMode::parse(s).is_some() => {}
        Some(_) => return Err(RouterError::config(CACHE_MODE_INVALID)),
    }
    require_bool(doc, "verbose")?;
    require_bool(doc, "cors")?;
    require_bool(doc, "output_error")?;
    match doc.get("timeout") {
        None | Some(Value::Null) | Some(Value::Number(_)) => {}
        Some(_) => return Err(RouterError::config(TIMEOUT_INVALID)),
    }
    Ok(())
}
