//! HTTP-level integration tests for the entity engine surface.
//!
//! Requires a running PostgreSQL database.
//! Run with: DATABASE_URL="postgresql:///entity_engine_test" cargo test -p entity-server --test http_integration

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use entity_core::KernelConfig;
use entity_server::router::build_router;
use entity_server::state::AppState;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

fn app(pool: PgPool) -> axum::Router {
    let state = Arc::new(AppState::new(pool, KernelConfig::default(), HashMap::new()));
    build_router(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[sqlx::test]
async fn health_check_returns_ok(pool: PgPool) {
    let response = app(pool)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[sqlx::test]
async fn define_noun_then_create_and_fetch_entity(pool: PgPool) {
    let app = app(pool);

    let define = Request::builder()
        .method("POST")
        .uri("/t/acme/nouns")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "Contact"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(define).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let create = Request::builder()
        .method("POST")
        .uri("/t/acme/entities/Contact")
        .header("content-type", "application/json")
        .body(Body::from(json!({"payload": {"name": "Ada"}, "context": "test"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["success"], true);
    assert_eq!(created["data"]["payload"]["name"], "Ada");
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let get = Request::builder()
        .uri(format!("/t/acme/entities/Contact/{id}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(get).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["success"], true);
    assert_eq!(fetched["data"]["id"], id);
    assert_eq!(fetched["data"]["version"], 1);
}

#[sqlx::test]
async fn get_unknown_entity_returns_404(pool: PgPool) {
    let app = app(pool);
    let define = Request::builder()
        .method("POST")
        .uri("/t/acme/nouns")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "Contact"}).to_string()))
        .unwrap();
    app.clone().oneshot(define).await.unwrap();

    let get = Request::builder()
        .uri("/t/acme/entities/Contact/contact_nonexistent")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(get).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test]
async fn tenant_deactivate_then_reactivate_round_trips(pool: PgPool) {
    let app = app(pool);

    let deactivate = Request::builder()
        .method("POST")
        .uri("/t/acme/deactivate")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(deactivate).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "deactivated");

    let reactivate = Request::builder()
        .method("POST")
        .uri("/t/acme/reactivate")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(reactivate).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "active");
}
