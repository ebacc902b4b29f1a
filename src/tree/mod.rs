//! # Handler Tree Module
//!
//! Indexes the handler source tree into an in-memory [`HandlerTreeNode`] that the
//! resolver walks for every request.
//!
//! ## Naming convention
//!
//! ```text
//! src/handlers/
//! ├── mod.rs                  # index: ""  (base path only)
//! ├── basic.rs                # basic
//! ├── nested-1/
//! │   └── nested_2/
//! │       └── basic.rs        # nested-1/nested_2/basic
//! └── user/
//!     └── _user_id/           # dynamic directory, binds user_id
//!         ├── mod.rs          # user/{user_id}
//!         └── item/
//!             └── _item_id.rs # user/{user_id}/item/{item_id}
//! ```
//!
//! - Names starting with `_` are dynamic and bind any segment value.
//! - Hyphens and underscores are interchangeable for lookup.
//! - `mod.rs` is the directory's index handler.
//!
//! ## Conflicts
//!
//! Detected once, when the tree is built:
//!
//! - two dynamic entries in one directory
//! - a file and a directory sharing a (normalized) name in one directory
//!
//! The same name at different depths is allowed.

mod indexer;
mod layout;
mod node;
#[cfg(test)]
mod tests;

pub use indexer::FileTreeIndexer;
pub use layout::{
    clean_path, is_dynamic_name, normalize_segment, param_name, HandlerLayout, HandlerMode,
    DEFAULT_EXTENSION, DYNAMIC_MARKER, INDEX_STEM,
};
pub use node::{DynamicEntry, HandlerFile, HandlerTreeNode, RouteEntry, TreeEntry};
