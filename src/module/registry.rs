use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use http::Method;

use crate::endpoint::{Handler, Requirements, RoutePattern};
use crate::event::{Request, Response};

/// One method of a handler module.
#[derive(Clone)]
pub struct MethodEntry {
    pub(crate) handler: Handler,
    pub(crate) requirements: Option<Arc<Requirements>>,
    pub(crate) route_pattern: Option<Arc<RoutePattern>>,
}

impl MethodEntry {
    #[must_use]
    pub fn requirements(&self) -> Option<&Requirements> {
        self.requirements.as_deref()
    }

    #[must_use]
    pub fn route_pattern(&self) -> Option<&RoutePattern> {
        self.route_pattern.as_deref()
    }
}

/// A loaded handler module: the functions one handler file exposes, keyed by method.
///
/// ```
/// use fsroute::{HandlerModule, Requirements};
/// use serde_json::json;
///
/// let module = HandlerModule::new()
///     .get(|_req, res| {
///         res.set_body(json!({"router_directory_basic": "GET"}));
///         Ok(())
///     })
///     .post_with(Requirements::new().required_query(["auth_id"]), |req, res| {
///         res.set_body(req.body.clone());
///         Ok(())
///     });
/// assert!(module.has_method(&http::Method::POST));
/// ```
#[derive(Clone, Default)]
pub struct HandlerModule {
    methods: HashMap<Method, MethodEntry>,
}

impl fmt::Debug for HandlerModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&str> = self.methods.keys().map(Method::as_str).collect();
        methods.sort_unstable();
        f.debug_struct("HandlerModule")
            .field("methods", &methods)
            .finish()
    }
}

macro_rules! method_shortcuts {
    ($($method:ident, $with:ident => $constant:ident;)*) => {
        $(
            #[must_use]
            pub fn $method<F>(self, handler: F) -> Self
            where
                F: Fn(&Request, &mut Response) -> anyhow::Result<()> + Send + Sync + 'static,
            {
                self.route(Method::$constant, handler)
            }

            #[must_use]
            pub fn $with<F>(self, requirements: Requirements, handler: F) -> Self
            where
                F: Fn(&Request, &mut Response) -> anyhow::Result<()> + Send + Sync + 'static,
            {
                self.route_with(Method::$constant, requirements, handler)
            }
        )*
    };
}

impl HandlerModule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose `handler` for `method` without requirements.
    #[must_use]
    pub fn route<F>(mut self, method: Method, handler: F) -> Self
    where
        F: Fn(&Request, &mut Response) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.methods.insert(
            method,
            MethodEntry {
                handler: Arc::new(handler),
                requirements: None,
                route_pattern: None,
            },
        );
        self
    }

    /// Expose `handler` for `method` with declared requirements.
    #[must_use]
    pub fn route_with<F>(mut self, method: Method, requirements: Requirements, handler: F) -> Self
    where
        F: Fn(&Request, &mut Response) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.methods.insert(
            method,
            MethodEntry {
                handler: Arc::new(handler),
                requirements: Some(Arc::new(requirements)),
                route_pattern: None,
            },
        );
        self
    }

    method_shortcuts! {
        get, get_with => GET;
        post, post_with => POST;
        put, put_with => PUT;
        patch, patch_with => PATCH;
        delete, delete_with => DELETE;
    }

    #[must_use]
    pub fn method(&self, method: &Method) -> Option<&MethodEntry> {
        self.methods.get(method)
    }

    #[must_use]
    pub fn has_method(&self, method: &Method) -> bool {
        self.methods.contains_key(method)
    }

    /// Exposed methods in a stable order.
    #[must_use]
    pub fn methods(&self) -> Vec<(&Method, &MethodEntry)> {
        let mut out: Vec<_> = self.methods.iter().collect();
        out.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        out
    }

    /// Compile every `required_route` template.
    pub(crate) fn compile_routes(&mut self) -> Result<(), String> {
        for (method, entry) in &mut self.methods {
            let Some(template) = entry
                .requirements
                .as_ref()
                .and_then(|r| r.required_route.as_deref())
            else {
                continue;
            };
            let pattern = RoutePattern::compile(template)
                .map_err(|e| format!("{method} required_route '{template}': {e}"))?;
            entry.route_pattern = Some(Arc::new(pattern));
        }
        Ok(())
    }
}

/// Produces a handler module on first load.
pub type ModuleFactory = Arc<dyn Fn() -> anyhow::Result<HandlerModule> + Send + Sync>;

/// Handler modules compiled into the host, keyed by import reference.
///
/// The handler tree says which file serves a path; the registry supplies the code for
/// that file. Keys follow [`HandlerLayout::import_reference`](crate::tree::HandlerLayout::import_reference),
/// e.g. `handlers::user::_user_id`.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    factories: BTreeMap<String, ModuleFactory>,
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, run at most once per loader when the module is first needed.
    pub fn register<F>(&mut self, import_reference: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> anyhow::Result<HandlerModule> + Send + Sync + 'static,
    {
        self.factories
            .insert(import_reference.into(), Arc::new(factory));
        self
    }

    /// Register a ready-made module.
    pub fn register_module(
        &mut self,
        import_reference: impl Into<String>,
        module: HandlerModule,
    ) -> &mut Self {
        self.register(import_reference, move || Ok(module.clone()))
    }

    #[must_use]
    pub fn with_module(mut self, import_reference: impl Into<String>, module: HandlerModule) -> Self {
        self.register_module(import_reference, module);
        self
    }

    #[must_use]
    pub fn factory(&self, import_reference: &str) -> Option<&ModuleFactory> {
        self.factories.get(import_reference)
    }

    #[must_use]
    pub fn contains(&self, import_reference: &str) -> bool {
        self.factories.contains_key(import_reference)
    }

    pub fn import_references(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
