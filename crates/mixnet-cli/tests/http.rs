use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use mixnet_cli::server::{AppState, build_router};
use mixnet_core::{Mixnet, MixnetConfig};

fn app_with(node_count: usize, path_length: usize) -> axum::Router {
    let mixnet = Mixnet::new(&MixnetConfig {
        node_count,
        path_length,
        ..Default::default()
    })
    .unwrap();

    build_router(AppState {
        mixnet: Arc::new(mixnet),
    })
}

fn app() -> axum::Router {
    app_with(10, 5)
}

/// Send a request to the app and return (status, body text).
async fn send_request(
    app: axum::Router,
    method: Method,
    uri: &str,
    body: &str,
) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let resp = app.oneshot(request).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&body).into_owned())
}

async fn mix_json(app: axum::Router, method: Method, body: &str) -> Value {
    let (status, text) = send_request(app, method, "/mix", body).await;
    assert_eq!(status, StatusCode::OK, "body: {text}");
    serde_json::from_str(&text).unwrap()
}

#[tokio::test]
async fn post_mix_returns_message() {
    let json = mix_json(app(), Method::POST, r#"{"message": "hello"}"#).await;
    assert_eq!(json, serde_json::json!({ "data": "hello" }));
}

#[tokio::test]
async fn get_mix_with_body_returns_message() {
    let json = mix_json(app(), Method::GET, r#"{"message": "over get"}"#).await;
    assert_eq!(json["data"], "over get");
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn missing_message_field_fails_to_mix() {
    let json = mix_json(app(), Method::POST, r#"{"text": "hello"}"#).await;
    assert_eq!(json, serde_json::json!({ "data": "Failed to mix message!" }));
}

#[tokio::test]
async fn malformed_json_fails_to_mix() {
    let json = mix_json(app(), Method::POST, "{not json").await;
    assert_eq!(json["data"], "Failed to mix message!");
}

#[tokio::test]
async fn empty_body_fails_to_mix() {
    let json = mix_json(app(), Method::GET, "").await;
    assert_eq!(json["data"], "Failed to mix message!");
}

#[tokio::test]
async fn empty_message_fails_to_mix() {
    let json = mix_json(app(), Method::POST, r#"{"message": ""}"#).await;
    assert_eq!(json["data"], "Failed to mix message!");
}

#[tokio::test]
async fn session_error_reported_with_kind() {
    let json = mix_json(app_with(3, 6), Method::POST, r#"{"message": "hello"}"#).await;

    assert_eq!(json["error"], "insufficient_nodes");
    assert!(
        json["data"].as_str().unwrap().contains("Insufficient nodes"),
        "data: {}",
        json["data"]
    );
}

#[tokio::test]
async fn oversized_message_reported_with_kind() {
    let message = "x".repeat(4096);
    let body = serde_json::json!({ "message": message }).to_string();

    let json = mix_json(app(), Method::POST, &body).await;
    assert_eq!(json["error"], "packet_construction");
}

#[tokio::test]
async fn shared_network_serves_repeated_requests() {
    let app = app();

    for i in 0..5 {
        let body = serde_json::json!({ "message": format!("message {i}") }).to_string();
        let json = mix_json(app.clone(), Method::POST, &body).await;
        assert_eq!(json["data"], format!("message {i}"));
    }
}

#[tokio::test]
async fn root_get_and_post_return_empty_ok() {
    for method in [Method::GET, Method::POST] {
        let (status, text) = send_request(app(), method, "/", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.is_empty());
    }
}

#[tokio::test]
async fn favicon_is_invalid_endpoint() {
    let (status, text) = send_request(app(), Method::GET, "/favicon.ico", "").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json, serde_json::json!({ "data": "invalid endpoint" }));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (status, _) = send_request(app(), Method::GET, "/nope", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
