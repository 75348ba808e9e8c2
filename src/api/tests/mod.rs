use super::*;
use crate::coordinator::test_helpers::{RecordingClient, create_coordinator_with, test_config};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;


struct TestApp {
    router: Router,
    coordinator: Arc<DeliveryCoordinator>,
    client: Arc<RecordingClient>,
}

fn test_app() -> TestApp {
    test_app_with(test_config())
}

fn test_app_with(config: Config) -> TestApp {
    let (coordinator, client) = create_coordinator_with(config.clone());
    let coordinator = Arc::new(coordinator);
    TestApp {
        router: create_router(coordinator.clone(), Arc::new(config)),
        coordinator,
        client,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_api_server_spawns() {
    let mut config = test_config();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let (coordinator, _client) = create_coordinator_with(config.clone());

    let handle = tokio::spawn(start_api_server(Arc::new(coordinator), Arc::new(config)));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!handle.is_finished(), "server should still be serving");
    handle.abort();
}

#[tokio::test]
async fn test_cors_headers_present_when_enabled() {
    let app = test_app();
    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_restricted_to_listed_origins() {
    let mut config = test_config();
    config.api.cors_origins = vec!["https://console.example.com".into()];
    let app = test_app_with(config);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "https://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "https://console.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://console.example.com"
    );
}

#[tokio::test]
async fn test_api_key_guards_every_route() {
    let mut config = test_config();
    config.api.api_key = Some("test-secret-key".into());
    let app = test_app_with(config);

    let (status, body) = send(&app, get("/buffers")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let request = Request::builder()
        .uri("/buffers")
        .header("X-Api-Key", "test-secret-key")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_swagger_ui_toggle() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(get("/swagger-ui/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut config = test_config();
    config.api.swagger_ui = false;
    let app = test_app_with(config);
    let response = app
        .router
        .clone()
        .oneshot(get("/swagger-ui/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = test_app();
    let response = app.router.clone().oneshot(get("/downloads")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
