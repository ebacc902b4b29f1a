//! # Router Module
//!
//! The request pipeline: turns an API Gateway proxy event into a proxy response.
//!
//! ```rust,ignore
//! use fsroute::{HandlerModule, ModuleRegistry, Router, RouterConfig};
//!
//! let registry = ModuleRegistry::new().with_module(
//!     "handlers::basic",
//!     HandlerModule::new().get(|_req, resp| {
//!         resp.set_body(serde_json::json!({"router_directory_basic": "GET"}));
//!         Ok(())
//!     }),
//! );
//! let router = Router::builder(RouterConfig::new("v1", "handlers"))
//!     .registry(registry)
//!     .before_all(|req, _resp, _reqs| {
//!         tracing::debug!(path = %req.path, "before_all");
//!         Ok(())
//!     })
//!     .build()?;
//! router.auto_load()?;
//! let response = router.route(&event);
//! ```
//!
//! ## Hooks
//!
//! | Hook | Runs |
//! |------|------|
//! | `before_all` | before auth and validation |
//! | `when_auth_required` | when the endpoint or its OpenAPI operation requires auth |
//! | `after_all` | after response validation |
//! | `on_error` | after an `ApiError` or routing error was written to the response |
//! | `on_timeout` | after a handler outlived `timeout` |
//! | `on_startup` / `on_shutdown` | from [`Router::warmup`] / [`Router::cooldown`] |
//!
//! Request hooks are skipped once the response carries errors.

mod core;
mod hooks;

pub use self::core::{Router, RouterBuilder};
pub use hooks::{ErrorHook, LifecycleHook, RequestHook};
