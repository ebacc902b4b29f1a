use std::fmt;
use std::sync::Arc;

use crate::endpoint::Requirements;
use crate::error::ApiError;
use crate::event::{Request, Response};

/// Hook run around the handler: `before_all`, `when_auth_required` and `after_all`.
///
/// Receives the endpoint's requirements, if it declared any. Returning an error aborts
/// the pipeline exactly like a failing handler.
pub type RequestHook =
    Arc<dyn Fn(&Request, &mut Response, Option<&Requirements>) -> anyhow::Result<()> + Send + Sync>;

/// Hook run after an error was written to the response: `on_error` and `on_timeout`.
///
/// Its own failures are logged and otherwise ignored.
pub type ErrorHook =
    Arc<dyn Fn(&Request, &mut Response, &ApiError) -> anyhow::Result<()> + Send + Sync>;

/// Hook run by [`Router::warmup`](super::Router::warmup) and
/// [`Router::cooldown`](super::Router::cooldown).
pub type LifecycleHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Default)]
pub(crate) struct Hooks {
    pub before_all: Option<RequestHook>,
    pub after_all: Option<RequestHook>,
    pub when_auth_required: Option<RequestHook>,
    pub on_error: Option<ErrorHook>,
    pub on_timeout: Option<ErrorHook>,
    pub on_startup: Vec<LifecycleHook>,
    pub on_shutdown: Vec<LifecycleHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_all", &self.before_all.is_some())
            .field("after_all", &self.after_all.is_some())
            .field("when_auth_required", &self.when_auth_required.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_timeout", &self.on_timeout.is_some())
            .field("on_startup", &self.on_startup.len())
            .field("on_shutdown", &self.on_shutdown.len())
            .finish()
    }
}
