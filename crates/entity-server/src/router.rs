//! Router construction for the entity engine HTTP surface.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;

/// Build the full axum router. Every route lives under `/t/:tenant` except
/// the liveness check — there is no subdomain routing or tenant auth here,
/// just enough surface to demonstrate reaching the kernel over HTTP.
pub fn build_router(state: Arc<AppState>) -> Router {
    let tenant_routes = Router::new()
        .route(
            "/nouns",
            post(handlers::nouns::define_noun).get(handlers::nouns::list_nouns),
        )
        .route("/nouns/:name", get(handlers::nouns::get_noun))
        .route(
            "/entities/:type",
            post(handlers::entities::create).get(handlers::entities::list),
        )
        .route(
            "/entities/:type/:id",
            get(handlers::entities::get)
                .patch(handlers::entities::update)
                .delete(handlers::entities::delete),
        )
        .route(
            "/entities/:type/:id/verbs/:verb",
            post(handlers::entities::execute_verb),
        )
        .route("/entities/:type/:id/history", get(handlers::entities::history))
        .route(
            "/entities/:type/:id/reconstruct",
            get(handlers::entities::reconstruct),
        )
        .route("/entities/:type/:id/diff", get(handlers::entities::diff))
        .route("/events", get(handlers::events::query))
        .route("/cdc", get(handlers::cdc::poll))
        .route(
            "/subscriptions",
            post(handlers::subscriptions::create).get(handlers::subscriptions::list),
        )
        .route(
            "/integration-hooks",
            post(handlers::integrations::register_hook).get(handlers::integrations::list_hooks),
        )
        .route(
            "/dispatch-log",
            get(handlers::integrations::list_dispatch_log),
        )
        .route(
            "/relationships",
            post(handlers::relationships::link)
                .delete(handlers::relationships::unlink)
                .get(handlers::relationships::lookup),
        )
        .route("/status", get(handlers::tenant::status))
        .route("/deactivate", post(handlers::tenant::deactivate))
        .route("/reactivate", post(handlers::tenant::reactivate));

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/t/:tenant", tenant_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
