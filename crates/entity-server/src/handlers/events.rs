//! GET /t/:tenant/events — query the event log (C5).

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use entity_types::{Envelope, Event, EventQuery};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct EventsQuery {
    pub since: Option<DateTime<Utc>>,
    #[serde(rename = "eventType")]
    pub event_type: Option<String>,
    #[serde(rename = "entityId")]
    pub entity_id: Option<String>,
    pub verb: Option<String>,
    pub limit: Option<u32>,
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Envelope<Vec<Event>>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let events = kernel
        .query_events(&EventQuery {
            since: query.since,
            event_type: query.event_type,
            entity_id: query.entity_id,
            verb: query.verb,
            limit: query.limit.unwrap_or(entity_types::entity::DEFAULT_LIST_LIMIT),
        })
        .await?;
    Ok(Json(Envelope::ok(events)))
}
