//! # Tests for Handlers
//!
//! Unit tests for the probe handlers plus router-level checks driven through
//! `tower::ServiceExt::oneshot` against an in-memory database.

use crate::config::AppConfig;
use crate::handlers::{health, readyz, root};
use crate::logging::TRACE_ID_HEADER;
use crate::models::{ServiceInfo, UserRole};
use crate::repositories::{NewUser, UserRepository};
use crate::server::{AppState, create_app};
use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::{Request, StatusCode, header},
    response::Json,
};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tower::ServiceExt;

fn disconnected_state() -> AppState {
    AppState::new(AppConfig::default(), DatabaseConnection::default())
        .expect("default config should produce a token service")
}

async fn memory_state() -> AppState {
    let config = AppConfig {
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        ..Default::default()
    };
    let db = crate::db::init_pool(&config).await.unwrap();
    crate::db::run_migrations(&db).await.unwrap();
    AppState::new(config, db).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_root_handler_returns_expected_service_info() {
    let Json(service_info) = root().await;

    assert_eq!(service_info.service, "MotorGuard API");
    assert_eq!(service_info.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(service_info.docs, "/docs");
}

#[tokio::test]
async fn test_service_info_serializes_expected_fields() {
    let json_value = serde_json::to_value(ServiceInfo::default()).unwrap();

    assert!(json_value.get("service").is_some());
    assert!(json_value.get("version").is_some());
    assert!(json_value.get("docs").is_some());
}

#[tokio::test]
async fn test_health_reports_ok() {
    let Json(status) = health().await;
    assert_eq!(status.status, "ok");
    assert!(status.message.is_none());
}

#[tokio::test]
async fn test_readyz_fails_without_database() {
    let error = readyz(State(disconnected_state())).await.unwrap_err();
    assert_eq!(error.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_readyz_succeeds_with_database() {
    let Json(status) = readyz(State(memory_state().await)).await.unwrap();
    assert_eq!(status.status, "ok");
}

#[tokio::test]
async fn test_responses_carry_trace_id_header() {
    let app = create_app(disconnected_state());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let trace_id = response.headers().get(TRACE_ID_HEADER).unwrap();
    assert_eq!(trace_id.len(), 32);
}

#[tokio::test]
async fn test_protected_route_without_token_is_unauthorized() {
    let app = create_app(memory_state().await);

    let response = app
        .oneshot(Request::builder().uri("/motors").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );
    let body = body_json(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert!(body["trace_id"].is_string());
}

#[tokio::test]
async fn test_device_route_without_key_is_unauthorized() {
    let app = create_app(memory_state().await);

    let request = Request::builder()
        .method("POST")
        .uri("/iot/telemetry/from-esp32")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid or inactive API key");
}

#[tokio::test]
async fn test_malformed_json_is_validation_failure() {
    let app = create_app(memory_state().await);

    let request = Request::builder()
        .method("POST")
        .uri("/auth/login-json")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_form_login_issues_bearer_token() {
    let state = memory_state().await;
    UserRepository::new(&state.db)
        .create(NewUser {
            full_name: "Tess Tech".to_string(),
            email: "tess@plant.example".to_string(),
            password: "wrench42".to_string(),
            role: UserRole::Technician,
        })
        .await
        .unwrap();
    let tokens = state.tokens.clone();
    let app = create_app(state);

    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=Tess%40plant.example&password=wrench42"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["token_type"], "bearer");
    let token = body["access_token"].as_str().unwrap();
    assert!(tokens.verify(token).is_ok());
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let state = memory_state().await;
    UserRepository::new(&state.db)
        .create(NewUser {
            full_name: "Tess Tech".to_string(),
            email: "tess@plant.example".to_string(),
            password: "wrench42".to_string(),
            role: UserRole::Technician,
        })
        .await
        .unwrap();
    let app = create_app(state);

    let request = Request::builder()
        .method("POST")
        .uri("/auth/login-json")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"email": "tess@plant.example", "password": "nope"}).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Incorrect email or password");
}

#[tokio::test]
async fn test_openapi_document_lists_security_schemes() {
    let app = create_app(disconnected_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let schemes = &body["components"]["securitySchemes"];
    assert!(schemes.get("bearer_auth").is_some());
    assert!(schemes.get("api_key").is_some());
    assert!(body["paths"].get("/iot/telemetry/from-esp32").is_some());
}
