use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ApiError;

/// One entry of the `errors` array of an error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub key_path: String,
    pub message: String,
}

/// Response under construction, rendered with [`Response::full`].
///
/// Errors accumulate: validation reports every problem it finds, and once any error is
/// set the body is replaced by `{"errors": [...]}`. A response that has errors but still
/// carries the default 200 code is sent as 400.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    code: u16,
    headers: BTreeMap<String, String>,
    body: Value,
    errors: Vec<ErrorDetail>,
    is_base64_encoded: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Response {
    /// Empty 200 response; `cors` adds the permissive CORS headers.
    #[must_use]
    pub fn new(cors: bool) -> Self {
        let mut headers = BTreeMap::new();
        if cors {
            headers.insert("Access-Control-Allow-Origin".to_string(), "*".to_string());
            headers.insert("Access-Control-Allow-Headers".to_string(), "*".to_string());
        }
        Self {
            code: 200,
            headers,
            body: Value::Null,
            errors: Vec::new(),
            is_base64_encoded: false,
        }
    }

    /// Status code; 400 when errors were set without choosing a code.
    #[must_use]
    pub fn code(&self) -> u16 {
        if self.has_errors() && self.code == 200 {
            400
        } else {
            self.code
        }
    }

    pub fn set_code(&mut self, code: u16) {
        self.code = code;
    }

    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn set_body(&mut self, body: Value) {
        self.body = body;
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn set_base64_encoded(&mut self, encoded: bool) {
        self.is_base64_encoded = encoded;
    }

    pub fn set_error(&mut self, key_path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ErrorDetail {
            key_path: key_path.into(),
            message: message.into(),
        });
    }

    /// Record an [`ApiError`], taking over its status code.
    pub fn set_api_error(&mut self, error: &ApiError) {
        self.code = error.code;
        self.set_error(error.key_path.as_str(), error.message.as_str());
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn errors(&self) -> &[ErrorDetail] {
        &self.errors
    }

    /// Body the client receives: the error envelope when errors were set.
    #[must_use]
    pub fn rendered_body(&self) -> Value {
        if self.has_errors() {
            json!({ "errors": self.errors })
        } else {
            self.body.clone()
        }
    }

    /// API Gateway proxy response: `statusCode`, `headers`, `body`, `isBase64Encoded`.
    ///
    /// The body is JSON-encoded unless it already is a string.
    #[must_use]
    pub fn full(&self) -> Value {
        let body = match self.rendered_body() {
            Value::String(raw) => raw,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        json!({
            "statusCode": self.code(),
            "headers": self.headers,
            "body": body,
            "isBase64Encoded": self.is_base64_encoded,
        })
    }
}
