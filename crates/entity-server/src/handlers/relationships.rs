//! Relationship edge endpoints — thin pass-through to `RelationshipStore`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use entity_types::{EngineError, Envelope, RelationshipEdge};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EdgeRequest {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

pub async fn link(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    Json(req): Json<EdgeRequest>,
) -> Result<Json<Envelope<serde_json::Value>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    kernel
        .relationships()
        .link(&req.subject, &req.predicate, &req.object)
        .await?;
    Ok(Json(Envelope::ok(serde_json::json!({"linked": true}))))
}

pub async fn unlink(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    Json(req): Json<EdgeRequest>,
) -> Result<Json<Envelope<serde_json::Value>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    kernel
        .relationships()
        .unlink(&req.subject, &req.predicate, &req.object)
        .await?;
    Ok(Json(Envelope::ok(serde_json::json!({"unlinked": true}))))
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub direction: String,
    pub node: String,
    pub predicate: String,
}

pub async fn lookup(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<Envelope<Vec<RelationshipEdge>>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let edges = match query.direction.as_str() {
        "forward" => kernel.relationships().forward(&query.node, &query.predicate).await?,
        "reverse" => kernel.relationships().reverse(&query.node, &query.predicate).await?,
        other => return Err(EngineError::BadInput(format!("unknown direction '{other}'")).into()),
    };
    Ok(Json(Envelope::ok(edges)))
}
