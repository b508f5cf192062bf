//! Router-level tests for the HTTP transport

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use fabric::{api::build_router, Fabric, InMemoryStore, SqlStore, Triple};
use serde_json::{json, Value};
use tower::ServiceExt;

fn memory_router() -> Router {
    build_router(Fabric::from_store(InMemoryStore::new()), 64 * 1024)
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, String) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn insert(router: &Router, source: &str, predicate: &str, target: &str, weight: f64) {
    let body = json!({"source": source, "predicate": predicate, "target": target, "weight": weight});
    let (status, _) = send(router, Method::POST, "/triples", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_insert_and_query() {
    let router = memory_router();
    insert(&router, "bob", "knows", "john", 1.0).await;

    let (status, body) = send(&router, Method::GET, "/triples?predicate=~%20know*", None).await;
    assert_eq!(status, StatusCode::OK);
    let triples: Vec<Triple> = serde_json::from_str(&body).unwrap();
    assert_eq!(triples, vec![Triple::new("bob", "knows", "john", 1.0)]);
}

#[tokio::test]
async fn test_insert_errors() {
    let router = memory_router();
    insert(&router, "bob", "knows", "john", 1.0).await;

    let body = json!({"source": "bob", "predicate": "knows", "target": "john", "weight": 2.0});
    let (status, text) = send(&router, Method::POST, "/triples", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let error: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(error["code"], "DUPLICATE_TRIPLE");

    let body = json!({"source": "bob?", "predicate": "knows", "target": "john"});
    let (status, text) = send(&router, Method::POST, "/triples", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(error["code"], "INVALID_FIELD");
}

#[tokio::test]
async fn test_rejected_body_uses_error_shape() {
    let router = memory_router();

    let body = json!({"source": "a"});
    let (status, text) = send(&router, Method::POST, "/triples", Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let error: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(error["code"], "INVALID_BODY");
    assert!(error["message"].as_str().unwrap().contains("predicate"));

    let request = Request::builder()
        .method(Method::PATCH)
        .uri("/triples")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error["code"], "INVALID_BODY");
}

#[tokio::test]
async fn test_reweight_count_delete() {
    let router = memory_router();
    insert(&router, "bob", "knows", "john", 1.0).await;
    insert(&router, "alice", "knows", "bob", 2.0).await;

    let body = json!({"source": {"type": "=", "value": "bob"}, "delta": 5.0});
    let (status, text) = send(&router, Method::PATCH, "/triples", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"updated": 1}));

    let (status, text) = send(&router, Method::GET, "/triples/count?weight=gte%206", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"count": 1}));

    let (status, text) = send(&router, Method::DELETE, "/triples?source==%20bob", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"deleted": 1}));

    let (_, text) = send(&router, Method::GET, "/triples/count", None).await;
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"count": 1}));
}

#[tokio::test]
async fn test_noop_reweight_is_bad_request() {
    let router = memory_router();
    let body = json!({"delta": 0.0, "replace": false});
    let (status, text) = send(&router, Method::PATCH, "/triples", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(error["code"], "NO_OP_UPDATE");
}

#[tokio::test]
async fn test_malformed_clause_parameter() {
    let router = memory_router();
    let (status, _) = send(&router, Method::GET, "/triples?source=bob", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, text) = send(&router, Method::GET, "/triples?source=!%20bob", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(error["code"], "UNSUPPORTED_CLAUSE");
}

#[tokio::test]
async fn test_sqlite_unfiltered_delete_rejected() {
    let store = SqlStore::open_in_memory().unwrap();
    store.setup().await.unwrap();
    let router = build_router(Fabric::from_store(store), 64 * 1024);
    insert(&router, "bob", "knows", "john", 1.0).await;

    let (status, text) = send(&router, Method::DELETE, "/triples", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(error["code"], "MISSING_FILTER");
}

#[tokio::test]
async fn test_dot_format() {
    let router = memory_router();
    insert(&router, "bob", "knows", "john", 1.0).await;

    let (status, body) = send(&router, Method::GET, "/triples?format=dot", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        "digraph fabric {\n  \"bob\" -> \"john\" [label=\"knows\" weight=1.000000];\n}\n"
    );
}

#[tokio::test]
async fn test_health_and_metrics() {
    let router = memory_router();
    let (status, text) = send(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(health["backend"], "memory");
    assert_eq!(health["capabilities"], json!({"count": true, "reweight": true}));

    insert(&router, "bob", "knows", "john", 1.0).await;
    let (status, text) = send(&router, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("fabric_store_requests_total"));
}
