use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use lru::LruCache;
use tracing::debug;

use super::path::ResolvedRoute;
use crate::config::CacheMode;

/// LRU of resolved routes keyed by the request path relative to the base path.
///
/// Entries are whole [`ResolvedRoute`] values, so a hit returns exactly the parameters
/// of the path that produced it. `LruCache::get` needs `&mut` to bump recency, hence
/// the mutex rather than a read/write lock.
pub struct RouteCache {
    entries: Mutex<LruCache<String, ResolvedRoute>>,
    mode: CacheMode,
}

impl RouteCache {
    /// `size` of 0 means unbounded.
    #[must_use]
    pub fn new(size: usize, mode: CacheMode) -> Self {
        let entries = match NonZeroUsize::new(size) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            entries: Mutex::new(entries),
            mode,
        }
    }

    #[must_use]
    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    pub fn get(&self, path: &str) -> Option<ResolvedRoute> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let hit = entries.get(path).cloned();
        if hit.is_some() {
            debug!(path, "Route cache hit");
        }
        hit
    }

    /// Store `route` if the cache mode admits it. Returns whether it was stored.
    pub fn put(&self, path: &str, route: &ResolvedRoute) -> bool {
        if !self.mode.admits(route.is_dynamic) {
            return false;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((evicted, _)) = entries.push(path.to_string(), route.clone()) {
            if evicted != path {
                debug!(path, evicted = %evicted, "Route cache evicted entry");
            }
        }
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::path::ParamVec;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn route(file: &str, params: &[(&str, &str)]) -> ResolvedRoute {
        let path_params: ParamVec = params
            .iter()
            .map(|(k, v)| (Arc::<str>::from(*k), (*v).to_string()))
            .collect();
        ResolvedRoute {
            file_path: PathBuf::from(file),
            relative_path: PathBuf::from(file),
            import_reference: file.to_string(),
            route: file.to_string(),
            is_dynamic: !path_params.is_empty(),
            path_params,
            consumed: 1,
        }
    }

    #[test]
    fn test_static_only_skips_dynamic_routes() {
        let cache = RouteCache::new(0, CacheMode::StaticOnly);
        assert!(cache.put("basic", &route("basic.rs", &[])));
        assert!(!cache.put("user/1", &route("_id.rs", &[("id", "1")])));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("user/1").is_none());
    }

    #[test]
    fn test_dynamic_only_skips_static_routes() {
        let cache = RouteCache::new(0, CacheMode::DynamicOnly);
        assert!(!cache.put("basic", &route("basic.rs", &[])));
        assert!(cache.put("user/1", &route("_id.rs", &[("id", "1")])));
        assert_eq!(cache.get("user/1").unwrap().get_path_param("id"), Some("1"));
    }

    #[test]
    fn test_bounded_cache_evicts_least_recent() {
        let cache = RouteCache::new(2, CacheMode::All);
        cache.put("a", &route("a.rs", &[]));
        cache.put("b", &route("b.rs", &[]));
        assert!(cache.get("a").is_some());
        cache.put("c", &route("c.rs", &[]));
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_entries_keep_their_own_params() {
        let cache = RouteCache::new(0, CacheMode::All);
        cache.put("user/1", &route("_id.rs", &[("id", "1")]));
        cache.put("user/2", &route("_id.rs", &[("id", "2")]));
        assert_eq!(cache.get("user/1").unwrap().get_path_param("id"), Some("1"));
        assert_eq!(cache.get("user/2").unwrap().get_path_param("id"), Some("2"));
    }
}
