//! Tenant lifecycle endpoints (§4.11).

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use entity_types::{Envelope, TenantMetadata};

use crate::error::AppError;
use crate::state::AppState;

pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
) -> Result<Json<Envelope<TenantMetadata>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    Ok(Json(Envelope::ok(kernel.status().await?)))
}

pub async fn deactivate(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
) -> Result<Json<Envelope<TenantMetadata>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    Ok(Json(Envelope::ok(kernel.deactivate().await?)))
}

pub async fn reactivate(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
) -> Result<Json<Envelope<TenantMetadata>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    Ok(Json(Envelope::ok(kernel.reactivate().await?)))
}
