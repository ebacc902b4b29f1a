//! # fsroute
//!
//! **fsroute** routes API Gateway proxy events to handlers by filesystem convention: the
//! layout of a handler directory *is* the route table. No routes are declared anywhere.
//!
//! ## Overview
//!
//! Given a base path `unit-test/v1` and a handler directory `src/handlers`:
//!
//! ```text
//! src/handlers/
//! ├── mod.rs              →  /unit-test/v1
//! ├── basic.rs            →  /unit-test/v1/basic
//! ├── nested-1/
//! │   └── nested-2/
//! │       └── basic.rs    →  /unit-test/v1/nested-1/nested-2/basic (or nested_1/nested_2)
//! └── user/
//!     └── _user_id.rs     →  /unit-test/v1/user/{user_id}
//! ```
//!
//! Each handler file is backed by a [`HandlerModule`] registered under the file's import
//! reference (`handlers::user::_user_id`). The module maps HTTP methods to handler
//! functions and the [`Requirements`] they declare. Rust has no runtime module loading, so
//! the file only has to exist; the code is compiled into the host.
//!
//! ## Architecture
//!
//! - **[`tree`]** - indexes the handler directory (or glob) into an immutable tree
//! - **[`resolver`]** - walks the tree per request, caches resolved routes, produces the
//!   [`Endpoint`]
//! - **[`module`]** - the registry of handler modules and the at-most-once module loader
//! - **[`router`]** - the request pipeline with hooks, validation and error rendering
//! - **[`validator`]** - requirement and OpenAPI validation backed by `jsonschema`
//! - **[`config`]** - [`RouterConfig`] and its validation
//! - **[`event`]** - [`Request`] and [`Response`] for API Gateway proxy events
//! - **[`logging`]** - `tracing-subscriber` setup
//! - **[`cli`]** - `routes` and `generate-openapi`
//!
//! ### Request Flow
//!
//! ```text
//! event ─► Request ─► strip base path ─► route cache? ─► PathResolver ─► ResolvedRoute
//!                                                                            │
//!                     Response ◄─ handler ◄─ Endpoint ◄─ HandlerModule ◄─ ModuleLoader
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fsroute::{ApiError, HandlerModule, ModuleRegistry, Requirements, Router, RouterConfig};
//!
//! let registry = ModuleRegistry::new()
//!     .with_module(
//!         "handlers::user::_user_id",
//!         HandlerModule::new().get_with(
//!             Requirements::new().required_headers(["x-api-key"]),
//!             |req, resp| {
//!                 let id = req.get_path_param("user_id").unwrap_or_default();
//!                 if id == "0" {
//!                     return Err(ApiError::new(404, "user_id", "no such user").into());
//!                 }
//!                 resp.set_body(serde_json::json!({ "id": id }));
//!                 Ok(())
//!             },
//!         ),
//!     );
//!
//! let router = Router::builder(RouterConfig::new("unit-test/v1", "src/handlers"))
//!     .registry(registry)
//!     .build()?;
//! router.auto_load()?;
//!
//! // In the function entry point:
//! let proxy_response = router.route(&event);
//! ```
//!
//! ## Matching Rules
//!
//! - Hyphens and underscores are interchangeable in literal segments.
//! - A literal file or directory beats the dynamic (`_name`) entry at the same level.
//! - Dynamic entries bind the request segment verbatim.
//! - A path ending at a directory uses its index file: `<dir>/<dir>_controller.rs` in
//!   pattern mode, then `mod.rs`.
//! - Once a file matches, remaining segments are ignored unless the method declares a
//!   `required_route` such as `triple/{x}/{y}/{z}`, which must then match the whole path.
//!
//! ## Logging
//!
//! Everything is instrumented with `tracing`; install a subscriber with
//! [`logging::init_logging`] or bring your own.

pub mod cli;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod logging;
pub mod module;
pub mod resolver;
pub mod router;
pub mod tree;
pub mod validator;

pub use config::{CacheMode, OpenApiSource, RouterConfig};
pub use endpoint::{Endpoint, Handler, Requirements, SchemaRef};
pub use error::{ApiError, RouterError};
pub use event::{Request, Response};
pub use module::{HandlerModule, ModuleRegistry};
pub use resolver::Resolver;
pub use router::{Router, RouterBuilder};
