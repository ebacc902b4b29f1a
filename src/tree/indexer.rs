use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use super::layout::{is_dynamic_name, normalize_segment, param_name, HandlerLayout, HandlerMode};
use super::node::{DynamicEntry, HandlerFile, HandlerTreeNode, TreeEntry};
use crate::error::RouterError;

/// Builds the [`HandlerTreeNode`] index for a [`HandlerLayout`].
///
/// Conflicts are detected while inserting, so a tree that comes back is valid:
/// at most one dynamic entry per directory, and no two entries (of either kind)
/// sharing a normalized name within one directory. The same name at different depths
/// is fine.
pub struct FileTreeIndexer<'a> {
    layout: &'a HandlerLayout,
}

impl<'a> FileTreeIndexer<'a> {
    #[must_use]
    pub fn new(layout: &'a HandlerLayout) -> Self {
        Self { layout }
    }

    /// Scan the handler root on disk.
    ///
    /// Entries are visited in file-name order so that the result, and the first conflict
    /// reported, is the same for a fixed filesystem state. Hidden entries are skipped.
    pub fn build(&self) -> Result<HandlerTreeNode, RouterError> {
        let root = self.layout.root();
        let max_depth = if self.layout.is_recursive() {
            usize::MAX
        } else {
            1
        };

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e));

        let mut tree = HandlerTreeNode::default();
        let mut files = 0usize;
        for entry in walker {
            let entry = entry.map_err(|e| {
                RouterError::config(format!(
                    "handlers directory '{}' cannot be read: {e}",
                    root.display()
                ))
            })?;
            let relative = match entry.path().strip_prefix(root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => continue,
            };
            if relative.to_str().is_none() {
                warn!(path = %entry.path().display(), "Skipping non UTF-8 handler path");
                continue;
            }

            if entry.file_type().is_dir() {
                // Pattern mode only knows directories through the files inside them.
                if self.layout.mode() == HandlerMode::Directory {
                    self.insert_directory_path(&mut tree, &relative)?;
                }
            } else if self.insert_file_path(&mut tree, relative)? {
                files += 1;
            }
        }

        info!(
            handlers = %self.layout,
            mode = ?self.layout.mode(),
            files,
            "Handler tree indexed"
        );
        Ok(tree)
    }

    /// Build the tree from paths relative to the handler root, without touching disk.
    ///
    /// Paths are sorted first, so the input order does not matter.
    pub fn from_paths<I, P>(&self, paths: I) -> Result<HandlerTreeNode, RouterError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut paths: Vec<PathBuf> = paths
            .into_iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect();
        paths.sort();

        let mut tree = HandlerTreeNode::default();
        for path in paths {
            if self.layout.is_recursive() || path.components().count() == 1 {
                self.insert_file_path(&mut tree, path)?;
            }
        }
        Ok(tree)
    }

    fn insert_directory_path(
        &self,
        tree: &mut HandlerTreeNode,
        relative: &Path,
    ) -> Result<(), RouterError> {
        let mut node = tree;
        let mut location = PathBuf::new();
        for name in normal_components(relative) {
            node = insert_directory(node, name, &location)?;
            location.push(name);
        }
        Ok(())
    }

    /// Returns whether the file was registered as a handler.
    fn insert_file_path(
        &self,
        tree: &mut HandlerTreeNode,
        relative: PathBuf,
    ) -> Result<bool, RouterError> {
        let parts: Vec<&str> = normal_components(&relative).collect();
        let Some((file_name, dirs)) = parts.split_last() else {
            return Ok(false);
        };

        let is_index = self.layout.is_index(file_name);
        let stem = match self.layout.capture(file_name) {
            Some(stem) => stem.to_string(),
            None => {
                debug!(file = %relative.display(), "Skipping file outside the handler glob");
                return Ok(false);
            }
        };

        let mut node = tree;
        let mut location = PathBuf::new();
        for name in dirs {
            node = insert_directory(node, name, &location)?;
            location.push(name);
        }

        let file = HandlerFile::new(relative.clone(), stem.clone());
        if is_index {
            node.index = Some(file);
            return Ok(true);
        }
        insert_file(node, &stem, file, &location)?;
        Ok(true)
    }
}

fn normal_components(path: &Path) -> impl Iterator<Item = &str> {
    path.components().filter_map(|c| match c {
        Component::Normal(name) => name.to_str(),
        _ => None,
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn conflict(location: &Path, message: &str) -> RouterError {
    let location = if location.as_os_str().is_empty() {
        ".".to_string()
    } else {
        location.display().to_string()
    };
    warn!(location = %location, reason = message, "Handler tree conflict");
    RouterError::conflict(location, message)
}

/// Find or create the directory `name` under `node`.
fn insert_directory<'n>(
    node: &'n mut HandlerTreeNode,
    name: &str,
    location: &Path,
) -> Result<&'n mut HandlerTreeNode, RouterError> {
    if is_dynamic_name(name) {
        let dynamic = node.dynamic_child.get_or_insert_with(|| {
            Box::new(DynamicEntry {
                raw_name: name.to_string(),
                param_name: param_name(name).into(),
                entry: TreeEntry::Directory(HandlerTreeNode::named(name)),
            })
        });
        if dynamic.raw_name != name {
            return Err(conflict(location, RouterError::TWO_DYNAMIC));
        }
        return match &mut dynamic.entry {
            TreeEntry::Directory(dir) => Ok(dir),
            TreeEntry::File(_) => Err(conflict(location, RouterError::FILE_DIR_SAME_NAME)),
        };
    }

    let key = normalize_segment(name).into_owned();
    let child = node
        .literal_children
        .entry(key)
        .or_insert_with(|| TreeEntry::Directory(HandlerTreeNode::named(name)));
    match child {
        TreeEntry::Directory(dir) if dir.name.as_deref() == Some(name) => Ok(dir),
        TreeEntry::Directory(_) => Err(conflict(location, RouterError::DUPLICATE_NAME)),
        TreeEntry::File(_) => Err(conflict(location, RouterError::FILE_DIR_SAME_NAME)),
    }
}

fn insert_file(
    node: &mut HandlerTreeNode,
    stem: &str,
    file: HandlerFile,
    location: &Path,
) -> Result<(), RouterError> {
    if is_dynamic_name(stem) {
        match node.dynamic() {
            Some(existing) if existing.raw_name == stem => {
                return Err(conflict(location, RouterError::FILE_DIR_SAME_NAME));
            }
            Some(_) => return Err(conflict(location, RouterError::TWO_DYNAMIC)),
            None => {}
        }
        node.dynamic_child = Some(Box::new(DynamicEntry {
            raw_name: stem.to_string(),
            param_name: param_name(stem).into(),
            entry: TreeEntry::File(file),
        }));
        return Ok(());
    }

    let key = normalize_segment(stem).into_owned();
    match node.literal_children.get(&key) {
        Some(TreeEntry::Directory(_)) => Err(conflict(location, RouterError::FILE_DIR_SAME_NAME)),
        Some(TreeEntry::File(_)) => Err(conflict(location, RouterError::DUPLICATE_NAME)),
        None => {
            node.literal_children.insert(key, TreeEntry::File(file));
            Ok(())
        }
    }
}
