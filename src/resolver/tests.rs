use std::fs;
use std::path::Path;
use std::sync::Arc;

use http::Method;
use serde_json::json;

use super::{PathResolver, Resolver, ResolverState};
use crate::config::{CacheMode, RouterConfig};
use crate::endpoint::Requirements;
use crate::error::RouterError;
use crate::event::Request;
use crate::module::{HandlerModule, ModuleRegistry};
use crate::tree::{FileTreeIndexer, HandlerLayout};

const DIRECTORY_TREE: &[&str] = &[
    "mod.rs",
    "basic.rs",
    "triple.rs",
    "_dynamic.rs",
    "nested-1/nested-2/basic.rs",
    "nested/_nested_id.rs",
    "user/_user_id/mod.rs",
    "user/_user_id/item/_item_id.rs",
    "empty/basic.rs",
];

fn resolve(paths: &[&str], path: &str) -> Result<super::ResolvedRoute, RouterError> {
    let layout = HandlerLayout::parse("src/handlers").unwrap();
    let tree = FileTreeIndexer::new(&layout).from_paths(paths.iter().copied()).unwrap();
    PathResolver::new(&layout, &tree).resolve_path(path)
}

fn params(route: &super::ResolvedRoute) -> Vec<(&str, &str)> {
    route
        .path_params
        .iter()
        .map(|(k, v)| (k.as_ref(), v.as_str()))
        .collect()
}

#[test]
fn test_literal_chain_has_no_params() {
    let route = resolve(DIRECTORY_TREE, "nested-1/nested-2/basic").unwrap();
    assert_eq!(route.relative_path, Path::new("nested-1/nested-2/basic.rs"));
    assert_eq!(route.file_path, Path::new("src/handlers/nested-1/nested-2/basic.rs"));
    assert_eq!(route.import_reference, "handlers::nested_1::nested_2::basic");
    assert_eq!(route.route, "nested-1/nested-2/basic");
    assert!(route.path_params.is_empty());
    assert!(!route.is_dynamic);
}

#[test]
fn test_underscore_request_matches_hyphenated_directory() {
    let route = resolve(DIRECTORY_TREE, "nested_1/nested_2/basic").unwrap();
    assert_eq!(route.relative_path, Path::new("nested-1/nested-2/basic.rs"));
}

#[test]
fn test_dynamic_value_keeps_hyphens() {
    let route = resolve(DIRECTORY_TREE, "nested/abc-123").unwrap();
    assert_eq!(params(&route), vec![("nested_id", "abc-123")]);
    assert_eq!(route.route, "nested/{nested_id}");
    assert!(route.is_dynamic);
}

#[test]
fn test_literal_beats_dynamic() {
    let route = resolve(DIRECTORY_TREE, "triple").unwrap();
    assert_eq!(route.relative_path, Path::new("triple.rs"));
    assert!(route.path_params.is_empty());

    let route = resolve(DIRECTORY_TREE, "anything").unwrap();
    assert_eq!(route.relative_path, Path::new("_dynamic.rs"));
    assert_eq!(params(&route), vec![("dynamic", "anything")]);
}

#[test]
fn test_nested_dynamic_bindings_in_order() {
    let route = resolve(DIRECTORY_TREE, "user/1/item/a").unwrap();
    assert_eq!(route.relative_path, Path::new("user/_user_id/item/_item_id.rs"));
    assert_eq!(params(&route), vec![("user_id", "1"), ("item_id", "a")]);
    assert_eq!(route.route, "user/{user_id}/item/{item_id}");
}

#[test]
fn test_path_ending_at_directory_uses_index() {
    let route = resolve(DIRECTORY_TREE, "user/1").unwrap();
    assert_eq!(route.relative_path, Path::new("user/_user_id/mod.rs"));
    assert_eq!(route.import_reference, "handlers::user::_user_id");
    assert_eq!(params(&route), vec![("user_id", "1")]);

    let route = resolve(DIRECTORY_TREE, "user/1/").unwrap();
    assert_eq!(route.relative_path, Path::new("user/_user_id/mod.rs"));
}

#[test]
fn test_directory_without_index_is_not_found() {
    let err = resolve(DIRECTORY_TREE, "empty").unwrap_err();
    assert_eq!(err.code(), 404);
    assert_eq!(err.message(), "route not found");

    let err = resolve(DIRECTORY_TREE, "user/1/item").unwrap_err();
    assert!(matches!(err, RouterError::NotFound { .. }));
}

#[test]
fn test_base_path_only_resolves_root_index() {
    let route = resolve(DIRECTORY_TREE, "").unwrap();
    assert_eq!(route.relative_path, Path::new("mod.rs"));
    assert_eq!(route.import_reference, "handlers");

    let err = resolve(&["basic.rs"], "").unwrap_err();
    assert_eq!(err.code(), 404);
}

#[test]
fn test_unknown_segment_is_not_found() {
    let err = resolve(&["basic.rs", "nested/basic.rs"], "nested/other").unwrap_err();
    match err {
        RouterError::NotFound { path } => assert_eq!(path, "nested/other"),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn test_trailing_segments_after_file_are_left_over() {
    let route = resolve(DIRECTORY_TREE, "triple/1/2/3").unwrap();
    assert_eq!(route.relative_path, Path::new("triple.rs"));
    assert_eq!(route.consumed, 1);
}

#[test]
fn test_repeated_resolution_does_not_leak_state() {
    let layout = HandlerLayout::parse("src/handlers").unwrap();
    let tree = FileTreeIndexer::new(&layout)
        .from_paths(DIRECTORY_TREE.iter().copied())
        .unwrap();
    let resolver = PathResolver::new(&layout, &tree);

    let first = resolver.resolve_path("user/1/item/a").unwrap();
    assert_eq!(first.path_params.len(), 2);

    let second = resolver.resolve_path("nested/xyz").unwrap();
    assert_eq!(params(&second), vec![("nested_id", "xyz")]);

    let third = resolver.resolve_path("basic").unwrap();
    assert!(third.path_params.is_empty());
    assert!(!third.is_dynamic);
    assert_eq!(third.relative_path, Path::new("basic.rs"));

    assert!(resolver.resolve_path("empty").is_err());
    let fourth = resolver.resolve_path("user/2").unwrap();
    assert_eq!(params(&fourth), vec![("user_id", "2")]);
}

#[test]
fn test_pattern_mode_resolution() {
    let layout = HandlerLayout::parse("src/handlers/**/*_controller.rs").unwrap();
    let tree = FileTreeIndexer::new(&layout)
        .from_paths([
            "basic_controller.rs",
            "home/home_controller.rs",
            "nested/_nested_id_controller.rs",
            "nested/reqs_controller.rs",
        ])
        .unwrap();
    let resolver = PathResolver::new(&layout, &tree);

    let route = resolver.resolve_path("home").unwrap();
    assert_eq!(route.relative_path, Path::new("home/home_controller.rs"));
    assert_eq!(route.import_reference, "handlers::home::home_controller");

    let route = resolver.resolve_path("nested/reqs").unwrap();
    assert_eq!(route.relative_path, Path::new("nested/reqs_controller.rs"));

    let route = resolver.resolve_path("nested/abc-123").unwrap();
    assert_eq!(params(&route), vec![("nested_id", "abc-123")]);

    assert!(resolver.resolve_path("nested").is_err());
}

fn text_module(text: &'static str) -> HandlerModule {
    HandlerModule::new().get(move |_, res| {
        res.set_body(json!(text));
        Ok(())
    })
}

fn registry() -> ModuleRegistry {
    ModuleRegistry::new()
        .with_module("handlers", text_module("root"))
        .with_module("handlers::basic", text_module("basic"))
        .with_module(
            "handlers::triple",
            HandlerModule::new().post_with(
                Requirements::new().required_route("triple/{x}/{y}/{z}"),
                |_, _| Ok(()),
            ),
        )
        .with_module("handlers::_dynamic", text_module("dynamic"))
        .with_module("handlers::nested::_nested_id", text_module("nested"))
        .with_module("handlers::user::_user_id", text_module("user"))
        .with_module("handlers::user::_user_id::item::_item_id", text_module("item"))
        .with_module("handlers::nested_1::nested_2::basic", text_module("nested basic"))
        .with_module("handlers::empty::basic", text_module("empty basic"))
}

fn facade(config: RouterConfig) -> Resolver {
    Resolver::new(&config, Arc::new(registry()))
        .unwrap()
        .with_tree_paths(DIRECTORY_TREE.iter().copied())
}

#[test]
fn test_get_endpoint_strips_base_path() {
    let resolver = facade(RouterConfig::new("/unit-test/v1/", "src/handlers"));
    assert_eq!(resolver.state(), ResolverState::Uninitialized);

    let endpoint = resolver
        .get_endpoint(&Request::new(Method::GET, "/unit-test/v1/user/42"))
        .unwrap();
    assert_eq!(endpoint.import_reference(), "handlers::user::_user_id");
    assert_eq!(endpoint.route(), "user/{user_id}");
    assert_eq!(endpoint.path_params()[0].1, "42");
    assert_eq!(resolver.state(), ResolverState::Ready);

    let root = resolver
        .get_endpoint(&Request::new(Method::GET, "unit-test/v1"))
        .unwrap();
    assert_eq!(root.import_reference(), "handlers");

    let err = resolver
        .get_endpoint(&Request::new(Method::GET, "/other/v1/basic"))
        .unwrap_err();
    assert_eq!(err.code(), 404);

    let err = resolver
        .get_endpoint(&Request::new(Method::GET, "/unit-test/v10/basic"))
        .unwrap_err();
    assert_eq!(err.code(), 404);
}

#[test]
fn test_get_endpoint_method_not_allowed() {
    let resolver = facade(RouterConfig::new("v1", "src/handlers"));
    let err = resolver
        .get_endpoint(&Request::new(Method::DELETE, "/v1/basic"))
        .unwrap_err();
    assert_eq!(err.code(), 403);
    assert_eq!(err.message(), "method not allowed");
}

#[test]
fn test_required_route_binds_trailing_segments() {
    let resolver = facade(RouterConfig::new("v1", "src/handlers"));
    let endpoint = resolver
        .get_endpoint(&Request::new(Method::POST, "/v1/triple/1/2/3"))
        .unwrap();
    assert_eq!(endpoint.route(), "triple/{x}/{y}/{z}");
    let bound: Vec<(&str, &str)> = endpoint
        .path_params()
        .iter()
        .map(|(k, v)| (k.as_ref(), v.as_str()))
        .collect();
    assert_eq!(bound, vec![("x", "1"), ("y", "2"), ("z", "3")]);

    let err = resolver
        .get_endpoint(&Request::new(Method::POST, "/v1/triple/1/2"))
        .unwrap_err();
    assert_eq!(err.code(), 404);
}

#[test]
fn test_route_cache_returns_path_specific_params() {
    let mut config = RouterConfig::new("v1", "src/handlers");
    config.cache_size = Some(0);
    config.cache_mode = CacheMode::All;
    let resolver = facade(config);

    let a = resolver
        .get_endpoint(&Request::new(Method::GET, "/v1/nested/a"))
        .unwrap();
    let b = resolver
        .get_endpoint(&Request::new(Method::GET, "/v1/nested/b"))
        .unwrap();
    let again = resolver
        .get_endpoint(&Request::new(Method::GET, "/v1/nested/a"))
        .unwrap();
    assert_eq!(a.path_params()[0].1, "a");
    assert_eq!(b.path_params()[0].1, "b");
    assert_eq!(again.path_params()[0].1, "a");
    assert_eq!(resolver.route_cache().map(|c| c.len()), Some(2));
}

#[test]
fn test_static_only_cache_skips_dynamic_paths() {
    let mut config = RouterConfig::new("v1", "src/handlers");
    config.cache_size = Some(8);
    config.cache_mode = CacheMode::StaticOnly;
    let resolver = facade(config);

    resolver
        .get_endpoint(&Request::new(Method::GET, "/v1/basic"))
        .unwrap();
    resolver
        .get_endpoint(&Request::new(Method::GET, "/v1/nested/a"))
        .unwrap();
    let cache = resolver.route_cache().unwrap();
    assert_eq!(cache.len(), 1);
    assert!(cache.get("basic").is_some());
}

#[test]
fn test_auto_load_loads_every_module() {
    let resolver = facade(RouterConfig::new("v1", "src/handlers"));
    assert_eq!(resolver.auto_load().unwrap(), DIRECTORY_TREE.len());
    assert_eq!(resolver.loader().loaded_count(), DIRECTORY_TREE.len());
}

#[test]
fn test_auto_load_fails_fast_on_unloadable_module() {
    let mut registry = registry();
    registry.register("handlers::basic", || anyhow::bail!("module raised on import"));
    let resolver = Resolver::new(&RouterConfig::new("v1", "src/handlers"), Arc::new(registry))
        .unwrap()
        .with_tree_paths(DIRECTORY_TREE.iter().copied());

    let err = resolver.auto_load().unwrap_err();
    assert!(matches!(err, RouterError::Load { ref import_reference, .. } if import_reference == "handlers::basic"));
    assert!(!resolver.loader().is_loaded("handlers::basic"));

    let err = resolver
        .get_endpoint(&Request::new(Method::GET, "/v1/basic"))
        .unwrap_err();
    assert_eq!(err.code(), 500);
}

#[test]
fn test_handler_files_and_routes_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("handlers");
    for path in DIRECTORY_TREE {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(&full, "").unwrap();
    }

    let config = RouterConfig::new("v1", root.to_str().unwrap());
    let resolver = Resolver::new(&config, Arc::new(registry())).unwrap();
    let files = resolver.handler_files().unwrap();
    assert_eq!(files.len(), DIRECTORY_TREE.len());
    assert_eq!(files[0], root.join("mod.rs"));

    let routes: Vec<String> = resolver
        .routes()
        .unwrap()
        .into_iter()
        .map(|r| r.route)
        .collect();
    assert!(routes.contains(&"user/{user_id}/item/{item_id}".to_string()));
    assert!(routes.contains(&"{dynamic}".to_string()));

    let endpoint = resolver
        .get_endpoint(&Request::new(Method::GET, "/v1/nested-1/nested-2/basic"))
        .unwrap();
    assert_eq!(endpoint.import_reference(), "handlers::nested_1::nested_2::basic");
}
