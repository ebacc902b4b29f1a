//! Error taxonomy shared by the resolver and the dispatcher.
//!
//! Two layers:
//!
//! - [`RouterError`] is what the routing core raises: tree-build conflicts, unmatched
//!   paths, missing methods, module load failures and bad configuration.
//! - [`ApiError`] is the structured `code` / `key_path` / `message` triple the dispatcher
//!   renders into a response. Handlers return it (wrapped in `anyhow::Error`) to pick the
//!   status code their caller sees.
//!
//! Every `RouterError` converts into an `ApiError`.

use std::fmt;

/// Structured API failure carried to the response body.
///
/// Renders as `{"errors": [{"key_path": .., "message": ..}]}` with `code` as the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code for the response
    pub code: u16,
    /// What failed (a field name, `headers`, `query_params`, `root`, ...)
    pub key_path: String,
    /// Human-readable description
    pub message: String,
}

impl ApiError {
    pub fn new(code: u16, key_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            key_path: key_path.into(),
            message: message.into(),
        }
    }

    /// 404 for a path that matches nothing in the handler tree.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(404, "unknown", "route not found")
    }

    /// 408 raised when a handler outlives the configured timeout.
    #[must_use]
    pub fn timeout() -> Self {
        Self::new(408, "unknown", "request timeout")
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.key_path, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Failures raised by the routing core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// The handler tree violates a naming rule. Raised once, at tree-build time.
    Conflict {
        /// Directory (relative to the handler root) where the conflict sits
        location: String,
        /// Which rule was violated
        message: String,
    },
    /// No literal or dynamic entry matched the request path.
    NotFound {
        /// The request path after the base path was stripped
        path: String,
    },
    /// The handler module exists but exposes no function for the request method.
    MethodNotAllowed {
        /// Import reference of the module
        import_reference: String,
        /// Requested HTTP method
        method: String,
    },
    /// The handler file is indexed but could not be loaded.
    Load {
        /// Import reference of the module that failed
        import_reference: String,
        /// Why the load failed
        reason: String,
    },
    /// Router configuration is invalid.
    Config {
        /// Which rule was violated
        message: String,
    },
}

impl RouterError {
    pub(crate) const TWO_DYNAMIC: &'static str =
        "Cannot have two dynamic files in the same directory.";
    pub(crate) const FILE_DIR_SAME_NAME: &'static str =
        "Cannot have file and directory share same name.";
    pub(crate) const DUPLICATE_NAME: &'static str =
        "Cannot have two entries normalize to the same name.";

    pub(crate) fn conflict(location: impl Into<String>, message: &str) -> Self {
        RouterError::Conflict {
            location: location.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        RouterError::Config {
            message: message.into(),
        }
    }

    /// HTTP status code this error maps to.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            RouterError::NotFound { .. } => 404,
            RouterError::MethodNotAllowed { .. } => 403,
            RouterError::Conflict { .. } | RouterError::Load { .. } | RouterError::Config { .. } => {
                500
            }
        }
    }

    /// Identifier of what failed, used as the `key_path` of the rendered error.
    #[must_use]
    pub fn key_path(&self) -> &str {
        match self {
            RouterError::Conflict { .. } => "handlers",
            RouterError::NotFound { .. } => "unknown",
            RouterError::MethodNotAllowed { .. } => "method",
            RouterError::Load {
                import_reference, ..
            } => import_reference,
            RouterError::Config { .. } => "config",
        }
    }

    /// Message without location details, as shown to API callers.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            RouterError::Conflict { message, .. } | RouterError::Config { message } => {
                message.clone()
            }
            RouterError::NotFound { .. } => "route not found".to_string(),
            RouterError::MethodNotAllowed { .. } => "method not allowed".to_string(),
            RouterError::Load { reason, .. } => format!("failed to load handler: {reason}"),
        }
    }
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::Conflict { location, message } => {
                write!(f, "Handler tree conflict in '{location}': {message}")
            }
            RouterError::NotFound { path } => write!(f, "route not found: '{path}'"),
            RouterError::MethodNotAllowed {
                import_reference,
                method,
            } => write!(
                f,
                "method not allowed: {method} is not exported by '{import_reference}'"
            ),
            RouterError::Load {
                import_reference,
                reason,
            } => write!(f, "failed to load handler '{import_reference}': {reason}"),
            RouterError::Config { message } => write!(f, "invalid router configuration: {message}"),
        }
    }
}

impl std::error::Error for RouterError {}

impl From<RouterError> for ApiError {
    fn from(err: RouterError) -> Self {
        ApiError::new(err.code(), err.key_path(), err.message())
    }
}
