use super::*;
use http::Method;
use serde_json::json;

fn config() -> RouterConfig {
    RouterConfig::new("unit-test/v1", "tests/handlers")
}

fn openapi() -> OpenApiDocument {
    OpenApiDocument::from_value(json!({
        "openapi": "3.1.0",
        "security": [{"ApiKey": []}],
        "paths": {
            "/unit-test/v1/basic": {
                "get": {
                    "parameters": [
                        {"in": "query", "name": "auth_id", "required": true},
                        {"in": "header", "name": "x-api-key", "required": true}
                    ],
                    "responses": {
                        "200": {
                            "content": {"application/json": {"schema": {
                                "$ref": "#/components/schemas/basic-response"
                            }}}
                        }
                    }
                },
                "post": {
                    "security": [],
                    "requestBody": {
                        "required": true,
                        "content": {"application/json": {"schema": {
                            "$ref": "#/components/schemas/basic-request"
                        }}}
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "basic-request": {
                    "type": "object",
                    "required": ["id"],
                    "properties": {"id": {"type": "string"}}
                },
                "basic-response": {
                    "type": "object",
                    "required": ["page_number"],
                    "properties": {"page_number": {"type": "integer"}}
                }
            }
        }
    }))
}

fn messages(response: &Response) -> Vec<(&str, &str)> {
    response
        .errors()
        .iter()
        .map(|e| (e.key_path.as_str(), e.message.as_str()))
        .collect()
}

fn routed(method: Method) -> Request {
    let mut request = Request::new(method, "/unit-test/v1/basic");
    request.route = "unit-test/v1/basic".to_string();
    request
}

#[test]
fn test_missing_required_query_and_header() {
    let validator = Validator::new(&config());
    let reqs = Requirements::new()
        .required_query(["auth_id"])
        .required_headers(["content-type"]);
    let mut response = Response::default();
    validator.validate_request(&Request::new(Method::GET, "/basic"), &mut response, &reqs);
    assert_eq!(
        messages(&response),
        vec![
            ("headers", "Please provide content-type in headers"),
            ("query_params", "Please provide auth_id in query_params"),
        ]
    );
    assert_eq!(response.code(), 400);
}

#[test]
fn test_required_header_lookup_ignores_case() {
    let validator = Validator::new(&config());
    let reqs = Requirements::new().required_headers(["Content-Type"]);
    let request = Request::new(Method::GET, "/basic").with_header("content-type", "application/json");
    let mut response = Response::default();
    validator.validate_request(&request, &mut response, &reqs);
    assert!(!response.has_errors());
}

#[test]
fn test_unavailable_header_and_query_rejected() {
    let validator = Validator::new(&config());
    let reqs = Requirements::new()
        .available_headers(["x-api-key"])
        .required_query(["auth_id"])
        .available_query(["page"]);
    let request = Request::new(Method::GET, "/basic")
        .with_header("x-api-key", "secret")
        .with_header("unknown-id", "1")
        .with_query("auth_id", "a")
        .with_query("page", "2")
        .with_query("sort", "asc");
    let mut response = Response::default();
    validator.validate_request(&request, &mut response, &reqs);
    assert_eq!(
        messages(&response),
        vec![
            ("headers", "unknown-id is not an available headers"),
            ("query_params", "sort is not an available query_params"),
        ]
    );
}

#[test]
fn test_inline_body_schema_errors_keyed_by_field() {
    let validator = Validator::new(&config());
    let reqs = Requirements::new().required_body(SchemaRef::Inline(json!({
        "type": "object",
        "properties": {"id": {"type": "string"}}
    })));
    let request = Request::new(Method::POST, "/basic").with_body(json!({"id": 3}));
    let mut response = Response::default();
    validator.validate_request(&request, &mut response, &reqs);
    assert_eq!(response.errors().len(), 1);
    assert_eq!(response.errors()[0].key_path, "id");
    assert_eq!(response.code(), 400);
}

#[test]
fn test_root_body_error_key() {
    let validator = Validator::new(&config());
    let reqs = Requirements::new().required_body(SchemaRef::Inline(json!({"type": "object"})));
    let request = Request::new(Method::POST, "/basic").with_body(json!([1, 2]));
    let mut response = Response::default();
    validator.validate_request(&request, &mut response, &reqs);
    assert_eq!(response.errors()[0].key_path, "root");
}

#[test]
fn test_component_body_schema_from_document() {
    let validator = Validator::new(&config()).with_document(openapi());
    let reqs = Requirements::new().required_body(SchemaRef::Component("basic-request".into()));

    let mut response = Response::default();
    let good = Request::new(Method::POST, "/basic").with_body(json!({"id": "abc"}));
    validator.validate_request(&good, &mut response, &reqs);
    assert!(!response.has_errors());

    let bad = Request::new(Method::POST, "/basic").with_body(json!({}));
    validator.validate_request(&bad, &mut response, &reqs);
    assert_eq!(response.errors().len(), 1);
    assert_eq!(response.errors()[0].key_path, "root");
}

#[test]
fn test_unknown_component_is_server_error() {
    let validator = Validator::new(&config());
    let reqs = Requirements::new().required_body(SchemaRef::Component("missing".into()));
    let mut response = Response::default();
    validator.validate_request(&Request::new(Method::POST, "/basic"), &mut response, &reqs);
    assert_eq!(response.code(), 500);
    assert_eq!(messages(&response), vec![("body", "schema missing not found")]);
}

#[test]
fn test_response_schema_violation_is_500() {
    let validator = Validator::new(&config());
    let reqs = Requirements::new().required_response(SchemaRef::Inline(json!({
        "type": "object",
        "required": ["page_number"],
        "properties": {"page_number": {"type": "integer"}}
    })));
    let mut response = Response::default();
    response.set_body(json!({"page_number": "one"}));
    validator.validate_response(&Request::new(Method::GET, "/basic"), &mut response, &reqs);
    assert_eq!(response.code(), 500);
    assert_eq!(response.errors()[0].key_path, "response.page_number");

    let mut response = Response::default();
    response.set_body(json!({"page_number": 1}));
    validator.validate_response(&Request::new(Method::GET, "/basic"), &mut response, &reqs);
    assert!(!response.has_errors());
}

#[test]
fn test_openapi_request_parameters() {
    let validator = Validator::new(&config()).with_document(openapi());
    let mut response = Response::default();
    validator.validate_request_with_openapi(&routed(Method::GET), &mut response);
    assert_eq!(
        messages(&response),
        vec![
            ("query_params", "Please provide auth_id in query_params"),
            ("headers", "Please provide x-api-key in headers"),
        ]
    );

    let request = routed(Method::GET)
        .with_query("auth_id", "a")
        .with_header("X-Api-Key", "secret");
    let mut response = Response::default();
    validator.validate_request_with_openapi(&request, &mut response);
    assert!(!response.has_errors());
}

#[test]
fn test_openapi_required_body() {
    let validator = Validator::new(&config()).with_document(openapi());
    let mut response = Response::default();
    validator.validate_request_with_openapi(&routed(Method::POST), &mut response);
    assert_eq!(messages(&response), vec![("body", "Please provide body in request")]);

    let mut response = Response::default();
    let request = routed(Method::POST).with_body(json!({"id": 1}));
    validator.validate_request_with_openapi(&request, &mut response);
    assert_eq!(response.errors()[0].key_path, "id");
}

#[test]
fn test_openapi_missing_operation_is_403() {
    let validator = Validator::new(&config()).with_document(openapi());
    let mut response = Response::default();
    validator.validate_request_with_openapi(&routed(Method::DELETE), &mut response);
    assert_eq!(response.code(), 403);
    assert_eq!(messages(&response), vec![("method", "method not allowed")]);
}

#[test]
fn test_openapi_response_validation() {
    let validator = Validator::new(&config()).with_document(openapi());
    let mut response = Response::default();
    response.set_body(json!({}));
    validator.validate_response_with_openapi(&routed(Method::GET), &mut response);
    assert_eq!(response.code(), 500);
    assert_eq!(response.errors()[0].key_path, "response");
}

#[test]
fn test_route_without_base_path_is_found() {
    let validator = Validator::new(&config()).with_document(OpenApiDocument::from_value(json!({
        "paths": {"/basic": {"get": {"security": [{"ApiKey": []}]}}}
    })));
    assert!(validator.request_has_security(&routed(Method::GET)));
}

#[test]
fn test_request_has_security() {
    let validator = Validator::new(&config()).with_document(openapi());
    assert!(validator.request_has_security(&routed(Method::GET)));
    assert!(!validator.request_has_security(&routed(Method::POST)));
    assert!(!Validator::new(&config()).request_has_security(&routed(Method::GET)));
}

#[test]
fn test_missing_openapi_file_fails_auto_load() {
    let mut config = config();
    config.openapi = Some(OpenApiSource::Path("does/not/exist.yml".into()));
    let err = Validator::new(&config).auto_load().unwrap_err();
    assert!(matches!(err, RouterError::Config { .. }));
}

#[test]
fn test_openapi_loaded_from_yaml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("openapi.yml");
    std::fs::write(
        &path,
        "openapi: 3.1.0\npaths:\n  /unit-test/v1/basic:\n    get:\n      security:\n        - ApiKey: []\n",
    )
    .unwrap();
    let mut config = config();
    config.openapi = Some(OpenApiSource::Path(path));
    let validator = Validator::new(&config);
    validator.auto_load().unwrap();
    assert!(validator.request_has_security(&routed(Method::GET)));
}

#[test]
fn test_key_path_formatting() {
    assert_eq!(key_path(None, ""), "root");
    assert_eq!(key_path(None, "/user/name"), "user.name");
    assert_eq!(key_path(Some("response"), ""), "response");
    assert_eq!(key_path(Some("response"), "/items/0"), "response.items.0");
}
