use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::layout::normalize_segment;

/// A handler file registered in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFile {
    relative_path: PathBuf,
    stem: String,
}

impl HandlerFile {
    pub(crate) fn new(relative_path: PathBuf, stem: impl Into<String>) -> Self {
        Self {
            relative_path,
            stem: stem.into(),
        }
    }

    /// Path relative to the handler root.
    #[must_use]
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    /// Segment captured by the handler glob (`basic` for `basic_controller.rs`).
    #[must_use]
    pub fn stem(&self) -> &str {
        &self.stem
    }
}

/// One child of a directory: a handler file or a nested directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    File(HandlerFile),
    Directory(HandlerTreeNode),
}

impl TreeEntry {
    #[must_use]
    pub fn is_directory(&self) -> bool {
        matches!(self, TreeEntry::Directory(_))
    }
}

/// The single "any value" child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicEntry {
    pub(crate) raw_name: String,
    pub(crate) param_name: Arc<str>,
    pub(crate) entry: TreeEntry,
}

impl DynamicEntry {
    /// Entry name as it appears on disk, without extension (`_user_id`).
    #[must_use]
    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    /// Name the matched segment is bound to (`user_id`).
    #[must_use]
    pub fn param_name(&self) -> &str {
        &self.param_name
    }

    /// Shared handle to the parameter name, cloned into every binding.
    pub(crate) fn param_key(&self) -> Arc<str> {
        Arc::clone(&self.param_name)
    }

    #[must_use]
    pub fn entry(&self) -> &TreeEntry {
        &self.entry
    }
}

/// One directory level of the handler tree.
///
/// Literal children are keyed by their normalized name (hyphens → underscores). The
/// tree is built once by the [`FileTreeIndexer`](super::FileTreeIndexer) and never
/// mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerTreeNode {
    pub(crate) name: Option<String>,
    pub(crate) literal_children: BTreeMap<String, TreeEntry>,
    pub(crate) dynamic_child: Option<Box<DynamicEntry>>,
    pub(crate) index: Option<HandlerFile>,
}

impl HandlerTreeNode {
    pub(crate) fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Raw directory name; `None` for the root.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Literal child by (already normalized) name.
    #[must_use]
    pub fn literal(&self, normalized: &str) -> Option<&TreeEntry> {
        self.literal_children.get(normalized)
    }

    #[must_use]
    pub fn dynamic(&self) -> Option<&DynamicEntry> {
        self.dynamic_child.as_deref()
    }

    /// The directory's `mod` index file.
    #[must_use]
    pub fn index(&self) -> Option<&HandlerFile> {
        self.index.as_ref()
    }

    #[must_use]
    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Handler used when a path ends at this directory.
    ///
    /// A file named after the directory itself wins (`home/home_controller.rs` for
    /// `home`), then the `mod` index.
    #[must_use]
    pub fn default_file(&self) -> Option<&HandlerFile> {
        self.pattern_index().or(self.index.as_ref())
    }

    fn pattern_index(&self) -> Option<&HandlerFile> {
        let name = self.name.as_deref()?;
        if let Some(TreeEntry::File(file)) = self.literal_children.get(&*normalize_segment(name)) {
            if file.stem == name {
                return Some(file);
            }
        }
        match self.dynamic() {
            Some(DynamicEntry {
                raw_name,
                entry: TreeEntry::File(file),
                ..
            }) if raw_name == name => Some(file),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.literal_children.is_empty() && self.dynamic_child.is_none() && self.index.is_none()
    }

    /// Every handler file below this node: index first, then literal children in name
    /// order, then the dynamic child.
    #[must_use]
    pub fn files(&self) -> Vec<&HandlerFile> {
        let mut out = Vec::new();
        self.collect_files(&mut out);
        out
    }

    fn collect_files<'a>(&'a self, out: &mut Vec<&'a HandlerFile>) {
        if let Some(index) = &self.index {
            out.push(index);
        }
        let children = self
            .literal_children
            .values()
            .chain(self.dynamic().map(|d| &d.entry));
        for child in children {
            match child {
                TreeEntry::File(file) => out.push(file),
                TreeEntry::Directory(dir) => dir.collect_files(out),
            }
        }
    }

    /// Route templates reachable in this tree, e.g. `user/{user_id}/item`.
    ///
    /// Templates are relative to the base path; the root index is the empty template.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteEntry<'_>> {
        let mut out = Vec::new();
        self.collect_routes(&mut Vec::new(), &mut out);
        out
    }

    fn collect_routes<'a>(&'a self, prefix: &mut Vec<String>, out: &mut Vec<RouteEntry<'a>>) {
        if let Some(file) = self.default_file() {
            out.push(RouteEntry::new(prefix, file));
        }
        for child in self.literal_children.values() {
            match child {
                TreeEntry::File(file) => {
                    prefix.push(file.stem.clone());
                    out.push(RouteEntry::new(prefix, file));
                    prefix.pop();
                }
                TreeEntry::Directory(dir) => {
                    prefix.push(dir.name.clone().unwrap_or_default());
                    dir.collect_routes(prefix, out);
                    prefix.pop();
                }
            }
        }
        if let Some(dynamic) = self.dynamic() {
            prefix.push(format!("{{{}}}", dynamic.param_name));
            match &dynamic.entry {
                TreeEntry::File(file) => out.push(RouteEntry::new(prefix, file)),
                TreeEntry::Directory(dir) => dir.collect_routes(prefix, out),
            }
            prefix.pop();
        }
    }
}

/// A route template and the handler file serving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry<'a> {
    pub template: String,
    pub file: &'a HandlerFile,
}

impl<'a> RouteEntry<'a> {
    fn new(prefix: &[String], file: &'a HandlerFile) -> Self {
        Self {
            template: prefix.join("/"),
            file,
        }
    }
}
