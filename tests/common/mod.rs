#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;

/// A handler tree on disk, removed when dropped.
pub struct HandlerTree {
    dir: TempDir,
}

impl HandlerTree {
    /// Create empty handler files at `files` (relative to `<tmp>/handlers`).
    pub fn new(files: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("handlers");
        fs::create_dir_all(&root).unwrap();
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "// handler\n").unwrap();
        }
        Self { dir }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("handlers")
    }

    /// `handlers` setting for directory mode.
    pub fn directory(&self) -> String {
        self.root().to_string_lossy().into_owned()
    }

    /// `handlers` setting for pattern mode, e.g. `**/*_controller.rs`.
    pub fn pattern(&self, glob: &str) -> String {
        format!("{}/{glob}", self.root().display())
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// API Gateway proxy event.
pub fn event(method: &str, path: &str) -> Value {
    json!({
        "path": path,
        "httpMethod": method,
        "headers": {"content-type": "application/json"},
        "queryStringParameters": null,
        "body": null,
        "isBase64Encoded": false,
    })
}

pub fn event_with(method: &str, path: &str, headers: Value, query: Value, body: Value) -> Value {
    json!({
        "path": path,
        "httpMethod": method,
        "headers": headers,
        "queryStringParameters": query,
        "body": body.to_string(),
        "isBase64Encoded": false,
    })
}

/// Decoded JSON body of a proxy response.
pub fn body(response: &Value) -> Value {
    serde_json::from_str(response["body"].as_str().unwrap()).unwrap()
}

pub fn open_headers() -> Value {
    json!({"Access-Control-Allow-Origin": "*", "Access-Control-Allow-Headers": "*"})
}
