use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use super::cache::RouteCache;
use super::path::{PathResolver, ResolvedRoute};
use crate::config::RouterConfig;
use crate::endpoint::Endpoint;
use crate::error::RouterError;
use crate::event::Request;
use crate::module::{ModuleLoader, ModuleRegistry};
use crate::tree::{FileTreeIndexer, HandlerLayout, HandlerTreeNode};

/// Lifecycle of a [`Resolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    /// The handler tree has not been built yet
    Uninitialized,
    /// The tree is built; modules load on first use
    Ready,
}

enum TreeSource {
    Disk,
    Paths(Vec<PathBuf>),
}

/// A route of the handler tree, as listed by [`Resolver::routes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// Template relative to the base path, e.g. `user/{user_id}`
    pub route: String,
    /// Handler file on disk
    pub file_path: PathBuf,
    pub import_reference: String,
}

/// Maps requests onto endpoints.
///
/// The handler tree is indexed once, lazily on the first request or eagerly through
/// [`Resolver::auto_load`], and never re-scanned. Per request the resolver strips the
/// base path, resolves the remaining path (through the route cache when enabled),
/// loads the module and picks the function for the request method.
pub struct Resolver {
    base_path: String,
    layout: HandlerLayout,
    source: TreeSource,
    tree: OnceCell<Result<HandlerTreeNode, RouterError>>,
    loader: ModuleLoader,
    cache: Option<RouteCache>,
}

impl Resolver {
    /// Resolver over the handler tree on disk.
    pub fn new(config: &RouterConfig, registry: Arc<ModuleRegistry>) -> Result<Self, RouterError> {
        config.validate()?;
        let layout = config.layout()?;
        let cache = config
            .cache_size
            .map(|size| RouteCache::new(size, config.cache_mode));
        debug!(
            base_path = %config.base_path,
            handlers = %layout,
            cache_size = ?config.cache_size,
            cache_mode = %config.cache_mode,
            "Resolver created"
        );
        Ok(Self {
            base_path: config.base_path.trim_matches('/').to_string(),
            layout,
            source: TreeSource::Disk,
            tree: OnceCell::new(),
            loader: ModuleLoader::new(registry),
            cache,
        })
    }

    /// Use `paths` (relative to the handler root) instead of scanning the disk.
    ///
    /// Handler files are then not required to exist.
    #[must_use]
    pub fn with_tree_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.source = TreeSource::Paths(paths.into_iter().map(Into::into).collect());
        self.loader = self.loader.without_file_checks();
        self.tree = OnceCell::new();
        self
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[must_use]
    pub fn layout(&self) -> &HandlerLayout {
        &self.layout
    }

    #[must_use]
    pub fn state(&self) -> ResolverState {
        if matches!(self.tree.get(), Some(Ok(_))) {
            ResolverState::Ready
        } else {
            ResolverState::Uninitialized
        }
    }

    #[must_use]
    pub fn route_cache(&self) -> Option<&RouteCache> {
        self.cache.as_ref()
    }

    #[must_use]
    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    /// The handler tree, built on first call.
    ///
    /// The build runs once. A failed build is kept and returned on every later call.
    pub fn tree(&self) -> Result<&HandlerTreeNode, RouterError> {
        self.tree
            .get_or_init(|| {
                let indexer = FileTreeIndexer::new(&self.layout);
                match &self.source {
                    TreeSource::Disk => indexer.build(),
                    TreeSource::Paths(paths) => indexer.from_paths(paths),
                }
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Strip the base path; `None` when `path` lies outside it.
    #[must_use]
    pub fn strip_base_path<'p>(&self, path: &'p str) -> Option<&'p str> {
        let path = path.trim_start_matches('/');
        if self.base_path.is_empty() {
            return Some(path);
        }
        let rest = path.strip_prefix(self.base_path.as_str())?;
        if rest.is_empty() {
            return Some(rest);
        }
        rest.strip_prefix('/')
    }

    /// Resolve a path relative to the base path, consulting the route cache.
    pub fn resolve(&self, relative: &str) -> Result<ResolvedRoute, RouterError> {
        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(relative)) {
            return Ok(cached);
        }
        let tree = self.tree()?;
        let route = PathResolver::new(&self.layout, tree).resolve_path(relative)?;
        if let Some(cache) = &self.cache {
            cache.put(relative, &route);
        }
        Ok(route)
    }

    /// Endpoint serving `request`.
    ///
    /// Fails with `NotFound` when no handler file matches, `Load` when the module cannot
    /// be loaded and `MethodNotAllowed` when the module has no function for the method.
    pub fn get_endpoint(&self, request: &Request) -> Result<Endpoint, RouterError> {
        let Some(relative) = self.strip_base_path(&request.path) else {
            warn!(path = %request.path, base_path = %self.base_path, "Request outside base path");
            return Err(RouterError::NotFound {
                path: request.path.clone(),
            });
        };

        let route = self.resolve(relative)?;
        let module = self.loader.load(&route)?;
        let Some(entry) = module.method(&request.method) else {
            return Err(RouterError::MethodNotAllowed {
                import_reference: route.import_reference,
                method: request.method.to_string(),
            });
        };

        let (template, params) = match entry.route_pattern() {
            Some(pattern) => match pattern.captures(relative) {
                Some(params) => (pattern.template().to_string(), params),
                None => {
                    debug!(
                        path = relative,
                        required_route = pattern.template(),
                        "Path does not match the handler's required route"
                    );
                    return Err(RouterError::NotFound {
                        path: relative.to_string(),
                    });
                }
            },
            None => (route.route, route.path_params),
        };

        Ok(Endpoint::new(
            request.method.clone(),
            route.import_reference,
            template,
            Arc::clone(&entry.handler),
            entry.requirements.clone(),
        )
        .with_path_params(params))
    }

    /// Build the tree and load every handler module, failing on the first error.
    ///
    /// Returns the number of modules loaded.
    pub fn auto_load(&self) -> Result<usize, RouterError> {
        let tree = self.tree()?;
        let mut loaded = 0usize;
        for file in tree.files() {
            let relative = file.relative_path();
            let import_reference = self.layout.import_reference(relative);
            self.loader
                .load_reference(&self.layout.root().join(relative), &import_reference)?;
            loaded += 1;
        }
        info!(handlers = %self.layout, modules = loaded, "Handler modules pre-loaded");
        Ok(loaded)
    }

    /// Every indexed handler file, index files first within each directory.
    pub fn handler_files(&self) -> Result<Vec<PathBuf>, RouterError> {
        let root = self.layout.root();
        Ok(self
            .tree()?
            .files()
            .into_iter()
            .map(|f| root.join(f.relative_path()))
            .collect())
    }

    /// Route table derived from the tree.
    pub fn routes(&self) -> Result<Vec<RouteInfo>, RouterError> {
        let root = self.layout.root();
        Ok(self
            .tree()?
            .routes()
            .into_iter()
            .map(|entry| RouteInfo {
                route: entry.template,
                file_path: root.join(entry.file.relative_path()),
                import_reference: self.layout.import_reference(entry.file.relative_path()),
            })
            .collect())
    }
}
