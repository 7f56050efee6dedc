//! entity-server — standalone illustrative REST server for the entity
//! engine.
//!
//! Reads config from env vars:
//!   DATABASE_URL                         — Postgres connection string (required)
//!   ENTITY_ENGINE_BIND_ADDR               — listen address (default: 0.0.0.0:4600)
//!   ENTITY_ENGINE_PAYMENTS_URL             — base URL for the PAYMENTS service binding (optional)
//!   ENTITY_ENGINE_REPO_URL                 — base URL for the REPO service binding (optional)
//!   ENTITY_ENGINE_OUTBOUND_TIMEOUT_MS      — per-call outbound timeout (default: 5000)
//!   ENTITY_ENGINE_SIGNATURE_HEADER         — webhook HMAC signature header name
//!   ENTITY_ENGINE_EVENT_HEADER             — webhook event-type header name
//!   ENTITY_ENGINE_DELIVERY_HEADER          — webhook delivery-id header name

use std::collections::HashMap;
use std::sync::Arc;

use entity_core::{HttpServiceBinding, KernelConfig, ServiceBinding};
use entity_server::router::build_router;
use entity_server::state::AppState;
use entity_types::IntegrationService;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

fn service_bindings() -> HashMap<IntegrationService, Arc<dyn ServiceBinding>> {
    let client = reqwest::Client::new();
    let mut bindings: HashMap<IntegrationService, Arc<dyn ServiceBinding>> = HashMap::new();

    if let Ok(url) = std::env::var("ENTITY_ENGINE_PAYMENTS_URL") {
        bindings.insert(
            IntegrationService::Payments,
            Arc::new(HttpServiceBinding::new(client.clone(), url)),
        );
    }
    if let Ok(url) = std::env::var("ENTITY_ENGINE_REPO_URL") {
        bindings.insert(
            IntegrationService::Repo,
            Arc::new(HttpServiceBinding::new(client.clone(), url)),
        );
    }

    bindings
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,entity_server=debug".into()),
        )
        .init();

    let database_url = entity_core::config::database_url_from_env();
    let bind_addr =
        std::env::var("ENTITY_ENGINE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:4600".into());

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("failed to connect to database");

    tracing::info!("connected to database");

    let state = Arc::new(AppState::new(
        pool,
        KernelConfig::from_env(),
        service_bindings(),
    ));

    let app = build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {bind_addr}: {e}"));
    tracing::info!("entity-server listening on {bind_addr}");

    axum::serve(listener, app).await.expect("server error");
}
