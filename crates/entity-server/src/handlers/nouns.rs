//! Noun schema endpoints — C3.
//!
//! POST /t/:tenant/nouns          — defineNoun
//! GET  /t/:tenant/nouns          — list nouns
//! GET  /t/:tenant/nouns/:name    — get noun

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use entity_core::TenantKernel;
use entity_types::{Envelope, NounDefinition, NounSchema};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DefineNounRequest {
    pub name: String,
    #[serde(flatten)]
    pub definition: NounDefinition,
}

pub async fn define_noun(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    Json(req): Json<DefineNounRequest>,
) -> Result<Json<Envelope<NounSchema>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let noun = kernel.define_noun(&req.name, req.definition).await?;
    Ok(Json(Envelope::ok(noun)))
}

pub async fn list_nouns(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
) -> Result<Json<Envelope<Vec<NounSchema>>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let nouns = kernel.list_nouns().await?;
    Ok(Json(Envelope::ok(nouns)))
}

pub async fn get_noun(
    State(state): State<Arc<AppState>>,
    Path((tenant, name)): Path<(String, String)>,
) -> Result<Json<Envelope<NounSchema>>, AppError> {
    let kernel: Arc<TenantKernel> = state.kernel(&tenant).await?;
    let noun = kernel
        .get_noun(&name)
        .await?
        .ok_or_else(|| entity_types::EngineError::SchemaMissing(name.clone()))?;
    Ok(Json(Envelope::ok(noun)))
}
