//! Entity endpoints — C4 default verbs, C6 custom verbs, C5 history, C7
//! time travel.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use entity_core::ReconstructAt;
use entity_types::{
    DiffResult, EngineError, Entity, Envelope, Event, Filter, ListParams, ListResult, Sort,
    SortDirection,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateEntityRequest {
    pub payload: Value,
    #[serde(default = "default_context")]
    pub context: String,
}

fn default_context() -> String {
    "api".to_string()
}

#[derive(Debug, Deserialize)]
pub struct UpdateEntityRequest {
    pub patch: Value,
    #[serde(rename = "expectedVersion")]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteVerbRequest {
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    /// A JSON object string, e.g. `filter={"stage":"open"}`.
    pub filter: Option<String>,
    #[serde(rename = "sortField")]
    pub sort_field: Option<String>,
    #[serde(rename = "sortDir")]
    pub sort_dir: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

fn parse_list_params(query: ListQuery) -> Result<ListParams, AppError> {
    let filter: Filter = match query.filter {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| EngineError::BadInput(format!("invalid filter: {e}")))?,
        None => Filter::default(),
    };
    let sort = query.sort_field.map(|field| Sort {
        field,
        direction: match query.sort_dir.as_deref() {
            Some("asc") => SortDirection::Asc,
            _ => SortDirection::Desc,
        },
    });
    Ok(ListParams {
        filter,
        sort,
        limit: query.limit.unwrap_or(entity_types::entity::DEFAULT_LIST_LIMIT),
        offset: query.offset.unwrap_or(0),
    })
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Path((tenant, entity_type)): Path<(String, String)>,
    Json(req): Json<CreateEntityRequest>,
) -> Result<(StatusCode, Json<Envelope<Entity>>), AppError> {
    let kernel = state.kernel(&tenant).await?;
    let entity = kernel.create(&entity_type, req.payload, &req.context).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(entity))))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path((tenant, entity_type, id)): Path<(String, String, String)>,
) -> Result<Json<Envelope<Entity>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let entity = kernel.get(&entity_type, &id).await?;
    Ok(Json(Envelope::ok(entity)))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Path((tenant, entity_type)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Envelope<ListResult<Entity>>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let params = parse_list_params(query)?;
    let result = kernel.list(&entity_type, params).await?;
    Ok(Json(Envelope::ok(result)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path((tenant, entity_type, id)): Path<(String, String, String)>,
    Json(req): Json<UpdateEntityRequest>,
) -> Result<Json<Envelope<Entity>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let entity = kernel
        .update(&entity_type, &id, req.patch, req.expected_version)
        .await?;
    Ok(Json(Envelope::ok(entity)))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path((tenant, entity_type, id)): Path<(String, String, String)>,
) -> Result<Json<Envelope<Entity>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let entity = kernel.delete(&entity_type, &id).await?;
    Ok(Json(Envelope::ok(entity)))
}

pub async fn execute_verb(
    State(state): State<Arc<AppState>>,
    Path((tenant, entity_type, id, verb)): Path<(String, String, String, String)>,
    Json(req): Json<ExecuteVerbRequest>,
) -> Result<Json<Envelope<serde_json::Value>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let (entity, event) = kernel.execute(&entity_type, &id, &verb, req.payload).await?;
    Ok(Json(Envelope::ok(
        serde_json::json!({"entity": entity, "event": event}),
    )))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Path((tenant, entity_type, id)): Path<(String, String, String)>,
) -> Result<Json<Envelope<Vec<Event>>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let events = kernel.history(&entity_type, &id).await?;
    Ok(Json(Envelope::ok(events)))
}

#[derive(Debug, Deserialize, Default)]
pub struct ReconstructQuery {
    #[serde(rename = "asOf")]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(rename = "atVersion")]
    pub at_version: Option<u64>,
}

pub async fn reconstruct(
    State(state): State<Arc<AppState>>,
    Path((tenant, entity_type, id)): Path<(String, String, String)>,
    Query(query): Query<ReconstructQuery>,
) -> Result<Json<Envelope<serde_json::Value>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let snapshot = kernel
        .reconstruct(
            &entity_type,
            &id,
            ReconstructAt {
                as_of: query.as_of,
                at_version: query.at_version,
            },
        )
        .await?;
    Ok(Json(Envelope::ok(snapshot)))
}

#[derive(Debug, Deserialize)]
pub struct DiffQuery {
    pub from: u64,
    pub to: u64,
}

pub async fn diff(
    State(state): State<Arc<AppState>>,
    Path((tenant, entity_type, id)): Path<(String, String, String)>,
    Query(query): Query<DiffQuery>,
) -> Result<Json<Envelope<DiffResult>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let result = kernel.diff(&entity_type, &id, query.from, query.to).await?;
    Ok(Json(Envelope::ok(result)))
}
