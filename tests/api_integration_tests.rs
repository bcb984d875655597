//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use quota_memo::memo::Fingerprint;
use quota_memo::{api::create_router, AppState};
use serde_json::Value;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_state() -> (TempDir, AppState) {
    let dir = tempdir().unwrap();
    let state = AppState::open(dir.path().join("memo.db"), dir.path().join("kv.db"), 5).unwrap();
    (dir, state)
}

fn create_test_app() -> (TempDir, Router) {
    let (dir, state) = create_test_state();
    (dir, create_router(state))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn put_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// == Usage Endpoint Tests ==

#[tokio::test]
async fn test_usage_reflects_fresh_calls_only() {
    let (_dir, state) = create_test_state();
    let square = |a: &(i64,)| Ok::<_, String>(a.0 * a.0);
    state.invoker.invoke("square", &(3,), 5, square).unwrap();
    state.invoker.invoke("square", &(3,), 5, square).unwrap();
    state.invoker.invoke("square", &(4,), 5, square).unwrap();
    let app = create_router(state);

    let response = app.oneshot(get("/usage/square")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["operation"], "square");
    assert_eq!(json["calls"], 2);
    assert_eq!(json["max_calls"], 5);
    assert_eq!(json["remaining"], 3);
}

#[tokio::test]
async fn test_usage_with_explicit_limit() {
    let (_dir, app) = create_test_app();

    let response = app.oneshot(get("/usage/other?max_calls=7")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["calls"], 0);
    assert_eq!(json["max_calls"], 7);
}

// == Records Endpoint Tests ==

#[tokio::test]
async fn test_record_found() {
    let (_dir, state) = create_test_state();
    let _ = state
        .invoker
        .invoke("divide", &(1, 0), 5, |a: &(i64, i64)| {
            a.0.checked_div(a.1).ok_or_else(|| "division by zero".to_string())
        });
    let app = create_router(state);
    let fp = Fingerprint::derive(&(1, 0)).unwrap();

    let response = app
        .oneshot(get(&format!("/records/divide/{fp}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["arguments"], serde_json::json!([1, 0]));
    assert_eq!(json["outcome"]["failure"], "division by zero");
}

#[tokio::test]
async fn test_record_not_found() {
    let (_dir, app) = create_test_app();
    let fp = Fingerprint::derive(&(42,)).unwrap();

    let response = app
        .oneshot(get(&format!("/records/square/{fp}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

// == KV Endpoint Tests ==

#[tokio::test]
async fn test_kv_roundtrip() {
    let (_dir, app) = create_test_app();

    let response = app
        .clone()
        .oneshot(put_json("/kv", r#"{"key":"crawler","value":{"page":3}}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/kv/crawler")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["value"]["page"], 3);
    assert_eq!(json["raw"], false);
}

#[tokio::test]
async fn test_kv_raw_bytes() {
    let (_dir, state) = create_test_state();
    state.kv.set_raw("blob", &[0xde, 0xad]).unwrap();
    let app = create_router(state);

    let response = app.oneshot(get("/kv/blob")).await.unwrap();

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["raw"], true);
    assert_eq!(json["value"], serde_json::json!([222, 173]));
}

#[tokio::test]
async fn test_kv_set_empty_key() {
    let (_dir, app) = create_test_app();

    let response = app
        .oneshot(put_json("/kv", r#"{"key":"","value":1}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_kv_set_key_too_long() {
    let (_dir, app) = create_test_app();
    let body = format!(r#"{{"key":"{}","value":1}}"#, "k".repeat(257));

    let response = app.oneshot(put_json("/kv", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("256 bytes"));
}

#[tokio::test]
async fn test_kv_delete() {
    let (_dir, state) = create_test_state();
    state.kv.set("gone", &true).unwrap();
    let app = create_router(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/kv/gone")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/kv/gone")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, app) = create_test_app();

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
}
