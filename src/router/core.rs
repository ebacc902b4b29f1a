use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::hooks::{ErrorHook, Hooks, LifecycleHook, RequestHook};
use crate::config::RouterConfig;
use crate::endpoint::{Endpoint, Requirements};
use crate::error::{ApiError, RouterError};
use crate::event::{Request, Response};
use crate::module::ModuleRegistry;
use crate::resolver::Resolver;
use crate::validator::{OpenApiDocument, Validator};

/// Raised when a handler outlives the configured timeout.
#[derive(Debug)]
struct HandlerTimeout(Duration);

impl fmt::Display for HandlerTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler exceeded timeout of {:?}", self.0)
    }
}

impl std::error::Error for HandlerTimeout {}

/// API Gateway request router.
///
/// Each call to [`Router::route`] runs the pipeline:
///
/// 1. resolve the endpoint from the request path and method
/// 2. `before_all`
/// 3. `when_auth_required`, when the endpoint requires auth or the OpenAPI operation
///    declares security
/// 4. request validation (OpenAPI or the endpoint's requirements)
/// 5. the handler, unless a previous step recorded errors
/// 6. response validation
/// 7. `after_all`
///
/// Any error along the way is rendered into the response: [`ApiError`]s and routing
/// failures keep their code and go to `on_error`, timeouts go to `on_timeout`, and
/// anything else (panics included) becomes a 500.
pub struct Router {
    config: RouterConfig,
    resolver: Resolver,
    validator: Validator,
    hooks: Hooks,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Start building a router for `config`.
    #[must_use]
    pub fn builder(config: RouterConfig) -> RouterBuilder {
        RouterBuilder::new(config)
    }

    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    #[must_use]
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Index the handler tree, load every handler module and the OpenAPI document.
    pub fn auto_load(&self) -> Result<(), RouterError> {
        let modules = self.resolver.auto_load()?;
        self.validator.auto_load()?;
        info!(
            base_path = %self.config.base_path,
            modules = modules,
            "Router loaded"
        );
        Ok(())
    }

    /// Run the `on_startup` hooks in registration order.
    pub fn warmup(&self) {
        debug!(hooks = self.hooks.on_startup.len(), "Running startup hooks");
        for hook in &self.hooks.on_startup {
            hook();
        }
    }

    /// Run the `on_shutdown` hooks in registration order.
    pub fn cooldown(&self) {
        debug!(hooks = self.hooks.on_shutdown.len(), "Running shutdown hooks");
        for hook in &self.hooks.on_shutdown {
            hook();
        }
    }

    /// Handle an API Gateway proxy event and return the proxy response.
    pub fn route(&self, event: &Value) -> Value {
        match Request::from_event(event) {
            Ok(request) => self.handle(request).full(),
            Err(e) => {
                warn!(error = %e, "Malformed API Gateway event");
                let mut response = Response::new(self.config.cors);
                response.set_api_error(&e);
                response.full()
            }
        }
    }

    /// Run the pipeline for an already parsed request.
    pub fn handle(&self, mut request: Request) -> Response {
        let mut response = Response::new(self.config.cors);
        let start = Instant::now();
        if self.config.verbose {
            info!(
                method = %request.method,
                path = %request.path,
                "request-received"
            );
        }

        if let Err(e) = self.run_procedure(&mut request, &mut response) {
            self.handle_error(&request, &mut response, &e);
        }

        if self.config.verbose {
            info!(
                method = %request.method,
                path = %request.path,
                route = %request.route,
                status = response.code(),
                latency_ms = start.elapsed().as_millis() as u64,
                "request-processed"
            );
        }
        response
    }

    fn run_procedure(&self, request: &mut Request, response: &mut Response) -> anyhow::Result<()> {
        let endpoint = self.resolver.get_endpoint(request)?;
        request.path_params = endpoint.path_params().clone();
        request.route = self.full_route(endpoint.route());
        let request = &*request;
        let requirements = endpoint.requirements();

        run_hook(self.hooks.before_all.as_ref(), request, response, requirements)?;

        if self.hooks.when_auth_required.is_some() && !response.has_errors() {
            let openapi_security = self.config.openapi_validate_request
                && self.validator.request_has_security(request);
            if openapi_security || endpoint.requires_auth() {
                run_hook(self.hooks.when_auth_required.as_ref(), request, response, requirements)?;
            }
        }

        if !response.has_errors() {
            if self.config.openapi_validate_request {
                self.validator.validate_request_with_openapi(request, response);
            } else if let Some(requirements) = requirements {
                self.validator.validate_request(request, response, requirements);
            }
        }

        if !response.has_errors() {
            self.run_endpoint(&endpoint, request, response)?;
        }

        if !response.has_errors() {
            if self.config.openapi_validate_request && self.config.openapi_validate_response {
                self.validator.validate_response_with_openapi(request, response);
            } else if self.config.openapi_validate_response && endpoint.has_required_response() {
                if let Some(requirements) = requirements {
                    self.validator.validate_response(request, response, requirements);
                }
            }
        }

        run_hook(self.hooks.after_all.as_ref(), request, response, requirements)
    }

    fn full_route(&self, route: &str) -> String {
        let base = self.resolver.base_path();
        match (base.is_empty(), route.is_empty()) {
            (true, _) => route.to_string(),
            (false, true) => base.to_string(),
            (false, false) => format!("{base}/{route}"),
        }
    }

    fn run_endpoint(
        &self,
        endpoint: &Endpoint,
        request: &Request,
        response: &mut Response,
    ) -> anyhow::Result<()> {
        let Some(limit) = self.config.timeout_duration() else {
            return run_guarded(endpoint, request, response);
        };

        let (tx, rx) = mpsc::channel();
        let worker_endpoint = endpoint.clone();
        let worker_request = request.clone();
        let mut worker_response = response.clone();
        thread::Builder::new()
            .name(format!("fsroute-{}", endpoint.import_reference()))
            .spawn(move || {
                let result = run_guarded(&worker_endpoint, &worker_request, &mut worker_response);
                let _ = tx.send((result, worker_response));
            })
            .context("failed to spawn handler thread")?;

        match rx.recv_timeout(limit) {
            Ok((result, handled)) => {
                *response = handled;
                result
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    import_reference = endpoint.import_reference(),
                    timeout_ms = limit.as_millis() as u64,
                    "Handler timed out"
                );
                Err(HandlerTimeout(limit).into())
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(anyhow!("handler thread exited without a response"))
            }
        }
    }

    fn handle_error(&self, request: &Request, response: &mut Response, error: &anyhow::Error) {
        let (api_error, hook) = if error.downcast_ref::<HandlerTimeout>().is_some() {
            (ApiError::timeout(), self.hooks.on_timeout.as_ref())
        } else if let Some(api_error) = error.downcast_ref::<ApiError>() {
            (api_error.clone(), self.hooks.on_error.as_ref())
        } else if let Some(router_error) = error.downcast_ref::<RouterError>() {
            (ApiError::from(router_error.clone()), self.hooks.on_error.as_ref())
        } else {
            let message = if self.config.output_error {
                format!("{error:#}")
            } else {
                "internal service error".to_string()
            };
            (ApiError::new(500, "unknown", message), None)
        };

        response.set_api_error(&api_error);
        match hook {
            Some(hook) => {
                if let Err(e) = hook(request, response, &api_error) {
                    error!(
                        path = %request.path,
                        error = %format!("{e:#}"),
                        "Error hook failed"
                    );
                }
            }
            None => error!(
                method = %request.method,
                path = %request.path,
                code = api_error.code,
                key_path = %api_error.key_path,
                error = %format!("{error:#}"),
                "Request failed"
            ),
        }
    }
}

fn run_hook(
    hook: Option<&RequestHook>,
    request: &Request,
    response: &mut Response,
    requirements: Option<&Requirements>,
) -> anyhow::Result<()> {
    match hook {
        Some(hook) if !response.has_errors() => hook(request, response, requirements),
        _ => Ok(()),
    }
}

fn run_guarded(endpoint: &Endpoint, request: &Request, response: &mut Response) -> anyhow::Result<()> {
    match panic::catch_unwind(AssertUnwindSafe(|| endpoint.run(request, response))) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(
                import_reference = endpoint.import_reference(),
                panic_message = %message,
                "Handler panicked"
            );
            Err(anyhow!("handler panicked: {message}"))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Builder for [`Router`]; the only place hooks can be attached.
pub struct RouterBuilder {
    config: RouterConfig,
    registry: Arc<ModuleRegistry>,
    tree_paths: Option<Vec<std::path::PathBuf>>,
    document: Option<OpenApiDocument>,
    hooks: Hooks,
}

impl RouterBuilder {
    #[must_use]
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            registry: Arc::new(ModuleRegistry::new()),
            tree_paths: None,
            document: None,
            hooks: Hooks::default(),
        }
    }

    /// Handler modules, keyed by import reference.
    #[must_use]
    pub fn registry(mut self, registry: impl Into<Arc<ModuleRegistry>>) -> Self {
        self.registry = registry.into();
        self
    }

    /// Index these relative paths instead of scanning the handler directory.
    #[must_use]
    pub fn tree_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<std::path::PathBuf>,
    {
        self.tree_paths = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Use an already loaded OpenAPI document instead of the configured source.
    #[must_use]
    pub fn openapi_document(mut self, document: OpenApiDocument) -> Self {
        self.document = Some(document);
        self
    }

    #[must_use]
    pub fn before_all<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request, &mut Response, Option<&Requirements>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.hooks.before_all = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn after_all<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request, &mut Response, Option<&Requirements>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.hooks.after_all = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn when_auth_required<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request, &mut Response, Option<&Requirements>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.hooks.when_auth_required = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request, &mut Response, &ApiError) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.on_error = Some(Arc::new(hook) as ErrorHook);
        self
    }

    #[must_use]
    pub fn on_timeout<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request, &mut Response, &ApiError) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.on_timeout = Some(Arc::new(hook) as ErrorHook);
        self
    }

    #[must_use]
    pub fn on_startup<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks.on_startup.push(Arc::new(hook) as LifecycleHook);
        self
    }

    #[must_use]
    pub fn on_shutdown<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks.on_shutdown.push(Arc::new(hook) as LifecycleHook);
        self
    }

    /// Validate the config and assemble the router. Nothing is indexed or loaded yet.
    pub fn build(self) -> Result<Router, RouterError> {
        let mut resolver = Resolver::new(&self.config, self.registry)?;
        if let Some(paths) = self.tree_paths {
            resolver = resolver.with_tree_paths(paths);
        }
        let mut validator = Validator::new(&self.config);
        if let Some(document) = self.document {
            validator = validator.with_document(document);
        }
        debug!(hooks = ?self.hooks, "Router built");
        Ok(Router {
            config: self.config,
            resolver,
            validator,
            hooks: self.hooks,
        })
    }
}
