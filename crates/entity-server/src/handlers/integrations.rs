//! Integration hook and dispatch-log endpoints — C9.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use entity_types::{DispatchLogEntry, Envelope, IntegrationHook, IntegrationService};
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterHookRequest {
    #[serde(rename = "entityType")]
    pub entity_type: String,
    pub verb: String,
    pub service: IntegrationService,
    pub method: String,
    pub config: Option<Value>,
}

pub async fn register_hook(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    Json(req): Json<RegisterHookRequest>,
) -> Result<Json<Envelope<IntegrationHook>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let hook = kernel
        .register_integration_hook(req.entity_type, req.verb, req.service, req.method, req.config)
        .await?;
    Ok(Json(Envelope::ok(hook)))
}

pub async fn list_hooks(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
) -> Result<Json<Envelope<Vec<IntegrationHook>>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let hooks = kernel.list_integration_hooks().await?;
    Ok(Json(Envelope::ok(hooks)))
}

#[derive(Debug, Deserialize, Default)]
pub struct DispatchLogQuery {
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
}

pub async fn list_dispatch_log(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    Query(query): Query<DispatchLogQuery>,
) -> Result<Json<Envelope<Vec<DispatchLogEntry>>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let log = kernel.list_dispatch_log(query.event_id.as_deref()).await?;
    Ok(Json(Envelope::ok(log)))
}
