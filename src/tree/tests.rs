use std::fs;
use std::path::Path;

use super::{FileTreeIndexer, HandlerLayout, HandlerTreeNode, TreeEntry};
use crate::error::RouterError;

fn directory_tree(paths: &[&str]) -> Result<HandlerTreeNode, RouterError> {
    let layout = HandlerLayout::parse("src/handlers").unwrap();
    FileTreeIndexer::new(&layout).from_paths(paths.iter().copied())
}

fn conflict_message(err: RouterError) -> String {
    match err {
        RouterError::Conflict { message, .. } => message,
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[test]
fn test_index_is_kept_apart_from_literals() {
    let tree = directory_tree(&["mod.rs", "basic.rs", "user/mod.rs"]).unwrap();
    assert_eq!(tree.index().map(|f| f.relative_path()), Some(Path::new("mod.rs")));
    assert!(tree.literal("mod").is_none());
    assert!(matches!(tree.literal("basic"), Some(TreeEntry::File(_))));
    match tree.literal("user") {
        Some(TreeEntry::Directory(user)) => assert!(user.has_index()),
        other => panic!("expected user directory, got {other:?}"),
    }
}

#[test]
fn test_hyphenated_names_are_normalized() {
    let tree = directory_tree(&["nested-1/nested-2/basic.rs"]).unwrap();
    let Some(TreeEntry::Directory(nested)) = tree.literal("nested_1") else {
        panic!("nested-1 should be keyed as nested_1");
    };
    assert_eq!(nested.name(), Some("nested-1"));
    assert!(nested.literal("nested_2").is_some());
}

#[test]
fn test_dynamic_entry_binds_param_name() {
    let tree = directory_tree(&["user/_user_id/item/_item_id.rs"]).unwrap();
    let Some(TreeEntry::Directory(user)) = tree.literal("user") else {
        panic!("missing user");
    };
    let dynamic = user.dynamic().unwrap();
    assert_eq!(dynamic.raw_name(), "_user_id");
    assert_eq!(dynamic.param_name(), "user_id");
    assert!(dynamic.entry().is_directory());
}

#[test]
fn test_two_dynamic_files_conflict() {
    let err = directory_tree(&["user/_id.rs", "user/_name.rs"]).unwrap_err();
    assert_eq!(
        conflict_message(err),
        "Cannot have two dynamic files in the same directory."
    );
}

#[test]
fn test_dynamic_file_and_directory_conflict() {
    let err = directory_tree(&["_id.rs", "_other/mod.rs"]).unwrap_err();
    assert_eq!(
        conflict_message(err),
        "Cannot have two dynamic files in the same directory."
    );
}

#[test]
fn test_file_and_directory_share_name() {
    let err = directory_tree(&["user.rs", "user/mod.rs"]).unwrap_err();
    assert_eq!(
        conflict_message(err),
        "Cannot have file and directory share same name."
    );

    let err = directory_tree(&["_id.rs", "_id/mod.rs"]).unwrap_err();
    assert_eq!(
        conflict_message(err),
        "Cannot have file and directory share same name."
    );
}

#[test]
fn test_file_and_directory_share_normalized_name() {
    let err = directory_tree(&["my-user.rs", "my_user/basic.rs"]).unwrap_err();
    assert_eq!(
        conflict_message(err),
        "Cannot have file and directory share same name."
    );
}

#[test]
fn test_two_files_normalizing_to_same_name() {
    let err = directory_tree(&["my-user.rs", "my_user.rs"]).unwrap_err();
    assert_eq!(
        conflict_message(err),
        "Cannot have two entries normalize to the same name."
    );
}

#[test]
fn test_same_name_at_different_levels_is_allowed() {
    let tree = directory_tree(&["user.rs", "admin/user/mod.rs", "admin/_id/user.rs"]).unwrap();
    assert_eq!(tree.files().len(), 3);
}

#[test]
fn test_conflict_location_is_reported() {
    let err = directory_tree(&["a/b/_x.rs", "a/b/_y.rs"]).unwrap_err();
    match err {
        RouterError::Conflict { location, .. } => assert_eq!(location, "a/b"),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[test]
fn test_pattern_mode_skips_files_outside_glob() {
    let layout = HandlerLayout::parse("src/handlers/**/*_controller.rs").unwrap();
    let tree = FileTreeIndexer::new(&layout)
        .from_paths(["home/home_controller.rs", "home/helpers.rs", "mod.rs"])
        .unwrap();
    assert!(!tree.has_index());
    let Some(TreeEntry::Directory(home)) = tree.literal("home") else {
        panic!("missing home");
    };
    assert_eq!(home.files().len(), 1);
    assert_eq!(
        home.default_file().map(|f| f.stem()),
        Some("home"),
        "a file named after its directory is the directory default"
    );
}

#[test]
fn test_non_recursive_pattern_ignores_nested_files() {
    let layout = HandlerLayout::parse("api/*.rs").unwrap();
    let tree = FileTreeIndexer::new(&layout)
        .from_paths(["basic.rs", "nested/basic.rs"])
        .unwrap();
    assert_eq!(tree.files().len(), 1);
}

#[test]
fn test_from_paths_is_order_independent() {
    let a = directory_tree(&["b.rs", "a/_id.rs", "mod.rs"]).unwrap();
    let b = directory_tree(&["mod.rs", "a/_id.rs", "b.rs"]).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_routes_use_placeholders() {
    let tree = directory_tree(&[
        "mod.rs",
        "basic.rs",
        "user/_user_id/mod.rs",
        "user/_user_id/item/_item_id.rs",
    ])
    .unwrap();
    let templates: Vec<String> = tree.routes().into_iter().map(|r| r.template).collect();
    assert_eq!(
        templates,
        vec![
            "".to_string(),
            "basic".to_string(),
            "user/{user_id}".to_string(),
            "user/{user_id}/item/{item_id}".to_string(),
        ]
    );
}

#[test]
fn test_build_walks_real_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("handlers");
    fs::create_dir_all(root.join("user/_user_id")).unwrap();
    fs::create_dir_all(root.join("empty")).unwrap();
    fs::create_dir_all(root.join(".hidden")).unwrap();
    fs::write(root.join("mod.rs"), "").unwrap();
    fs::write(root.join("user/_user_id/mod.rs"), "").unwrap();
    fs::write(root.join(".hidden/secret.rs"), "").unwrap();
    fs::write(root.join("notes.txt"), "").unwrap();

    let layout = HandlerLayout::parse(root.to_str().unwrap()).unwrap();
    let tree = FileTreeIndexer::new(&layout).build().unwrap();

    assert!(tree.has_index());
    assert!(matches!(tree.literal("empty"), Some(TreeEntry::Directory(d)) if d.is_empty()));
    assert!(tree.literal("_hidden").is_none());
    assert!(tree.literal(".hidden").is_none());
    assert_eq!(tree.files().len(), 2);
}

#[test]
fn test_build_reports_conflicts_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("handlers");
    fs::create_dir_all(root.join("user")).unwrap();
    fs::write(root.join("user.rs"), "").unwrap();
    fs::write(root.join("user/mod.rs"), "").unwrap();

    let layout = HandlerLayout::parse(root.to_str().unwrap()).unwrap();
    let err = FileTreeIndexer::new(&layout).build().unwrap_err();
    assert_eq!(err.code(), 500);
    assert_eq!(err.key_path(), "handlers");
}

#[test]
fn test_build_missing_root_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("missing");
    let layout = HandlerLayout::parse(root.to_str().unwrap()).unwrap();
    let err = FileTreeIndexer::new(&layout).build().unwrap_err();
    assert!(matches!(err, RouterError::Config { .. }));
}
