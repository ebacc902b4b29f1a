use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use super::registry::{HandlerModule, ModuleRegistry};
use crate::error::RouterError;
use crate::resolver::ResolvedRoute;

type ModuleSlot = Arc<OnceCell<Arc<HandlerModule>>>;

/// Loads handler modules by import reference and caches them.
///
/// Each import reference is initialised at most once even under concurrent requests:
/// callers racing on the same key share one `OnceCell` and only one runs the factory.
/// A failed load leaves no cache entry, so the next request retries it.
pub struct ModuleLoader {
    registry: Arc<ModuleRegistry>,
    check_files: bool,
    cache: DashMap<String, ModuleSlot>,
}

impl ModuleLoader {
    #[must_use]
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self {
            registry,
            check_files: true,
            cache: DashMap::new(),
        }
    }

    /// Skip the on-disk existence check, for trees built with
    /// [`FileTreeIndexer::from_paths`](crate::tree::FileTreeIndexer::from_paths).
    #[must_use]
    pub fn without_file_checks(mut self) -> Self {
        self.check_files = false;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Module serving `route`.
    pub fn load(&self, route: &ResolvedRoute) -> Result<Arc<HandlerModule>, RouterError> {
        self.load_reference(&route.file_path, &route.import_reference)
    }

    /// Module for `import_reference`, backed by the handler file at `file_path`.
    pub fn load_reference(
        &self,
        file_path: &Path,
        import_reference: &str,
    ) -> Result<Arc<HandlerModule>, RouterError> {
        // Clone the slot out so the shard lock is released before the factory runs.
        let slot: ModuleSlot = match self.cache.get(import_reference) {
            Some(slot) => Arc::clone(slot.value()),
            None => Arc::clone(
                self.cache
                    .entry(import_reference.to_string())
                    .or_insert_with(|| Arc::new(OnceCell::new()))
                    .value(),
            ),
        };

        if let Some(module) = slot.get() {
            debug!(import_reference, "Handler module cache hit");
            return Ok(Arc::clone(module));
        }

        let result = slot.get_or_try_init(|| self.load_uncached(file_path, import_reference));
        match result {
            Ok(module) => Ok(Arc::clone(module)),
            Err(err) => {
                self.cache
                    .remove_if(import_reference, |_, slot| slot.get().is_none());
                warn!(
                    import_reference,
                    file = %file_path.display(),
                    error = %err,
                    "Handler module failed to load"
                );
                Err(err)
            }
        }
    }

    fn load_uncached(
        &self,
        file_path: &Path,
        import_reference: &str,
    ) -> Result<Arc<HandlerModule>, RouterError> {
        let load_error = |reason: String| RouterError::Load {
            import_reference: import_reference.to_string(),
            reason,
        };

        if self.check_files && !file_path.is_file() {
            return Err(load_error(format!(
                "handler file {} does not exist",
                file_path.display()
            )));
        }
        let factory = self
            .registry
            .factory(import_reference)
            .ok_or_else(|| load_error("no module registered for this import reference".to_string()))?;
        let mut module = factory().map_err(|e| load_error(format!("{e:#}")))?;
        module.compile_routes().map_err(load_error)?;

        info!(
            import_reference,
            file = %file_path.display(),
            methods = ?module.methods().iter().map(|(m, _)| m.as_str()).collect::<Vec<_>>(),
            "Handler module loaded"
        );
        Ok(Arc::new(module))
    }

    /// Whether `import_reference` has been loaded successfully.
    #[must_use]
    pub fn is_loaded(&self, import_reference: &str) -> bool {
        self.cache
            .get(import_reference)
            .is_some_and(|slot| slot.get().is_some())
    }

    /// Number of loaded modules.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.cache.iter().filter(|slot| slot.get().is_some()).count()
    }
}
