//! GET /t/:tenant/cdc — poll the CDC stream (C10).

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use entity_types::{CdcQuery, Envelope, Event};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct CdcQueryParams {
    pub since: Option<String>,
    /// Comma-separated entity types.
    pub types: Option<String>,
    /// Comma-separated verbs.
    pub verbs: Option<String>,
}

fn split_csv(raw: Option<String>) -> Vec<String> {
    raw.map(|s| s.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect())
        .unwrap_or_default()
}

pub async fn poll(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    Query(query): Query<CdcQueryParams>,
) -> Result<Json<Envelope<Vec<Event>>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let events = kernel
        .cdc()
        .poll(&CdcQuery {
            since: query.since,
            types: split_csv(query.types),
            verbs: split_csv(query.verbs),
        })
        .await?;
    Ok(Json(Envelope::ok(events)))
}
