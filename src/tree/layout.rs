//! Handler layout: how the `handlers` setting maps file names onto route segments.

use std::borrow::Cow;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::RouterError;

/// Extension assumed for handler files when `handlers` names a plain directory.
pub const DEFAULT_EXTENSION: &str = "rs";

/// Stem of the per-directory index (default) handler file.
pub const INDEX_STEM: &str = "mod";

/// Leading marker of a dynamic (parameterized) tree entry.
pub const DYNAMIC_MARKER: char = '_';

/// Addressing convention, inferred from the `handlers` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerMode {
    /// `handlers` is a glob such as `src/handlers/**/*_controller.rs`
    Pattern,
    /// `handlers` is a root directory; every `*.rs` below it is a handler
    Directory,
}

/// Parsed `handlers` setting.
///
/// A glob has the shape `<root>[/**]/<prefix>*<suffix>`: the root is everything before
/// the first wildcard component, `**` enables recursion, and the single `*` in the file
/// name captures the route segment. `src/handlers/**/*_controller.rs` maps
/// `src/handlers/user/_user_id/item_controller.rs` onto `user/{user_id}/item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerLayout {
    mode: HandlerMode,
    root: PathBuf,
    file_prefix: String,
    file_suffix: String,
    extension: String,
    recursive: bool,
}

impl HandlerLayout {
    /// Parse the `handlers` setting.
    ///
    /// The presence of a `*` wildcard or a file extension is the only mode switch:
    /// anything else is a directory.
    pub fn parse(handlers: &str) -> Result<Self, RouterError> {
        let cleaned = clean_path(handlers);
        if cleaned.is_empty() {
            return Err(RouterError::config(
                "handlers is required; must be glob pattern string",
            ));
        }

        let last = cleaned.rsplit('/').next().unwrap_or(cleaned);
        if !cleaned.contains('*') && !last.contains('.') {
            return Ok(Self::directory(cleaned));
        }
        Self::pattern(cleaned)
    }

    fn directory(root: &str) -> Self {
        Self {
            mode: HandlerMode::Directory,
            root: PathBuf::from(root),
            file_prefix: String::new(),
            file_suffix: format!(".{DEFAULT_EXTENSION}"),
            extension: DEFAULT_EXTENSION.to_string(),
            recursive: true,
        }
    }

    fn pattern(pattern: &str) -> Result<Self, RouterError> {
        let parts: Vec<&str> = pattern.split('/').collect();
        let first_wild = parts.iter().position(|p| p.contains('*'));

        let (root_parts, rest) = match first_wild {
            Some(idx) => parts.split_at(idx),
            None => {
                return Err(RouterError::config(format!(
                    "handlers pattern '{pattern}' must contain a '*' wildcard in its file name"
                )))
            }
        };

        // Trailing `**` alone means "every handler file below root".
        let (middle, file_glob) = match rest {
            [only] if *only == "**" => (&rest[..], "*.rs"),
            [middle @ .., file] => (middle, *file),
            [] => (&rest[..], "*.rs"),
        };

        if middle.iter().any(|p| *p != "**") {
            return Err(RouterError::config(format!(
                "handlers pattern '{pattern}' only supports '**' between the root and the file name"
            )));
        }
        let recursive = !middle.is_empty();

        let mut pieces = file_glob.splitn(2, '*');
        let prefix = pieces.next().unwrap_or_default();
        let suffix = match pieces.next() {
            Some(s) if !s.contains('*') => s,
            _ => {
                return Err(RouterError::config(format!(
                    "handlers pattern '{pattern}' must have exactly one '*' in its file name"
                )))
            }
        };
        let extension = match suffix.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext.to_string(),
            _ => {
                return Err(RouterError::config(format!(
                    "handlers pattern '{pattern}' must end with a file extension"
                )))
            }
        };

        let root = if root_parts.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(root_parts.join("/"))
        };

        Ok(Self {
            mode: HandlerMode::Pattern,
            root,
            file_prefix: prefix.to_string(),
            file_suffix: suffix.to_string(),
            extension,
            recursive,
        })
    }

    #[must_use]
    pub fn mode(&self) -> HandlerMode {
        self.mode
    }

    /// Directory every handler path is relative to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// The handler glob relative to the root, e.g. `**/*_controller.rs`.
    #[must_use]
    pub fn file_glob(&self) -> String {
        let file = format!("{}*{}", self.file_prefix, self.file_suffix);
        if self.recursive {
            format!("**/{file}")
        } else {
            file
        }
    }

    /// File name of the per-directory index handler (`mod.rs`).
    #[must_use]
    pub fn index_file_name(&self) -> String {
        format!("{INDEX_STEM}.{}", self.extension)
    }

    /// Segment captured by the `*` of the glob, or `None` when `file_name` is not a handler.
    #[must_use]
    pub fn capture<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        let stem = file_name
            .strip_prefix(self.file_prefix.as_str())?
            .strip_suffix(self.file_suffix.as_str())?;
        (!stem.is_empty()).then_some(stem)
    }

    /// Whether `file_name` is the directory index and is covered by the glob.
    #[must_use]
    pub fn is_index(&self, file_name: &str) -> bool {
        file_name == self.index_file_name() && self.capture(file_name).is_some()
    }

    /// Module-cache key for a handler file.
    ///
    /// The root directory's name followed by the module path of `relative`, joined with
    /// `::`. Extensions are dropped, hyphens become underscores and an index file stands
    /// for its parent directory, so `user/_user_id/mod.rs` under `src/handlers` becomes
    /// `handlers::user::_user_id`.
    #[must_use]
    pub fn import_reference(&self, relative: &Path) -> String {
        let root_name = self
            .root
            .components()
            .rev()
            .find_map(|c| match c {
                Component::Normal(name) => name.to_str(),
                _ => None,
            })
            .unwrap_or("crate");

        let mut parts = vec![normalize_segment(root_name).into_owned()];
        let count = relative.components().count();
        for (i, component) in relative.components().enumerate() {
            let Component::Normal(name) = component else {
                continue;
            };
            let name = name.to_string_lossy();
            if i + 1 == count {
                if self.is_index(&name) {
                    break;
                }
                let module = name
                    .strip_suffix(&format!(".{}", self.extension))
                    .unwrap_or(&name);
                parts.push(normalize_segment(module).into_owned());
            } else {
                parts.push(normalize_segment(&name).into_owned());
            }
        }
        parts.join("::")
    }
}

impl fmt::Display for HandlerLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.root.display(), self.file_glob())
    }
}

/// Drop trailing separators and a leading `./`.
#[must_use]
pub fn clean_path(path: &str) -> &str {
    let trimmed = path.trim().trim_end_matches('/');
    trimmed.strip_prefix("./").unwrap_or(trimmed)
}

/// Lookup form of a segment or entry name: hyphens become underscores.
#[must_use]
pub fn normalize_segment(segment: &str) -> Cow<'_, str> {
    if segment.contains('-') {
        Cow::Owned(segment.replace('-', "_"))
    } else {
        Cow::Borrowed(segment)
    }
}

/// Whether a tree entry name denotes a dynamic segment.
#[must_use]
pub fn is_dynamic_name(name: &str) -> bool {
    name.starts_with(DYNAMIC_MARKER)
}

/// Placeholder name bound by a dynamic entry: `_user_id` → `user_id`, `_id_` → `id`.
#[must_use]
pub fn param_name(raw: &str) -> String {
    let trimmed = raw.trim_matches(DYNAMIC_MARKER);
    if trimmed.is_empty() {
        raw.to_string()
    } else {
        trimmed.to_string()
    }
}
