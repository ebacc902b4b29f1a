use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::debug;

use crate::error::RouterError;
use crate::tree::{
    is_dynamic_name, normalize_segment, DynamicEntry, HandlerFile, HandlerLayout, HandlerTreeNode, TreeEntry,
};

/// Maximum number of path parameters before heap allocation.
/// Handler trees rarely nest more than a handful of dynamic entries.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Ordered `(name, value)` path parameters.
///
/// Names come from the immutable tree and are shared; values are the request
/// segments exactly as received.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of resolving a request path against the handler tree.
///
/// Built fresh on every call, so two resolutions never share parameter state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    /// Handler root joined with the matched relative path
    pub file_path: PathBuf,
    /// Matched file relative to the handler root
    pub relative_path: PathBuf,
    /// Module registry key of the matched file
    pub import_reference: String,
    /// Route template relative to the base path, e.g. `user/{user_id}/item`
    pub route: String,
    /// Parameters bound by dynamic entries, in the order encountered
    pub path_params: ParamVec,
    /// Whether any dynamic entry took part in the match
    pub is_dynamic: bool,
    /// Number of request segments consumed by the tree walk
    pub consumed: usize,
}

impl ResolvedRoute {
    /// Get a path parameter by name (last write wins).
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Per-call scratch state of a tree walk.
#[derive(Default)]
struct Walk<'t> {
    template: Vec<Cow<'t, str>>,
    params: ParamVec,
    is_dynamic: bool,
}

impl<'t> Walk<'t> {
    fn literal(&mut self, name: &'t str) {
        self.template.push(Cow::Borrowed(name));
    }

    fn bind(&mut self, dynamic: &'t DynamicEntry, value: &str) {
        self.template
            .push(Cow::Owned(format!("{{{}}}", dynamic.param_name())));
        self.params.push((dynamic.param_key(), value.to_string()));
        self.is_dynamic = true;
    }
}

/// Walks a [`HandlerTreeNode`] segment by segment.
///
/// At each level a literal child (directory or file, matched by normalized name)
/// beats the dynamic child. A matched file ends the walk; a path that ends on a
/// directory falls back to that directory's default file. The resolver keeps no
/// state between calls.
pub struct PathResolver<'a> {
    layout: &'a HandlerLayout,
    tree: &'a HandlerTreeNode,
}

impl<'a> PathResolver<'a> {
    #[must_use]
    pub fn new(layout: &'a HandlerLayout, tree: &'a HandlerTreeNode) -> Self {
        Self { layout, tree }
    }

    /// Resolve a path relative to the base path, e.g. `user/1/item/abc-123`.
    pub fn resolve_path(&self, path: &str) -> Result<ResolvedRoute, RouterError> {
        let segments: Vec<&str> = path.split('/').collect();
        self.resolve(&segments)
    }

    /// Resolve pre-split segments. An empty slice is the base path itself.
    pub fn resolve(&self, segments: &[&str]) -> Result<ResolvedRoute, RouterError> {
        let segments = if segments.is_empty() { &[""][..] } else { segments };
        let mut walk = Walk::default();
        let mut node = self.tree;

        for (i, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                return match node.index() {
                    Some(index) => Ok(self.finish(index, walk, i + 1)),
                    None => Err(not_found(segments)),
                };
            }

            let key = normalize_segment(segment);
            let entry = if let Some(literal) = node.literal(&key) {
                literal
            } else if let Some(dynamic) = node.dynamic() {
                walk.bind(dynamic, segment);
                dynamic.entry()
            } else {
                return Err(not_found(segments));
            };

            match entry {
                TreeEntry::File(file) => {
                    if !is_dynamic_name(file.stem()) {
                        walk.literal(file.stem());
                    }
                    return Ok(self.finish(file, walk, i + 1));
                }
                TreeEntry::Directory(dir) => {
                    if let Some(name) = dir.name().filter(|n| !is_dynamic_name(n)) {
                        walk.literal(name);
                    }
                    node = dir;
                }
            }
        }

        match node.default_file() {
            Some(file) => Ok(self.finish(file, walk, segments.len())),
            None => Err(not_found(segments)),
        }
    }

    fn finish(&self, file: &HandlerFile, walk: Walk, consumed: usize) -> ResolvedRoute {
        let relative = file.relative_path();
        let route = ResolvedRoute {
            file_path: self.file_path(relative),
            relative_path: relative.to_path_buf(),
            import_reference: self.layout.import_reference(relative),
            route: walk.template.join("/"),
            path_params: walk.params,
            is_dynamic: walk.is_dynamic,
            consumed,
        };
        debug!(
            file = %route.relative_path.display(),
            import_reference = %route.import_reference,
            route = %route.route,
            params = ?route.path_params,
            dynamic = route.is_dynamic,
            "Route resolved"
        );
        route
    }

    fn file_path(&self, relative: &Path) -> PathBuf {
        self.layout.root().join(relative)
    }
}

fn not_found(segments: &[&str]) -> RouterError {
    RouterError::NotFound {
        path: segments.join("/"),
    }
}
