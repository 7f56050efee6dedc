//! Subscription endpoints — C8.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use entity_types::{Envelope, Subscription, SubscriptionMode};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub pattern: String,
    pub mode: SubscriptionMode,
    pub endpoint: String,
    pub secret: Option<String>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    Json(req): Json<CreateSubscriptionRequest>,
) -> Result<Json<Envelope<Subscription>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let sub = kernel
        .create_subscription(req.pattern, req.mode, req.endpoint, req.secret)
        .await?;
    Ok(Json(Envelope::ok(sub)))
}

#[derive(Debug, Deserialize, Default)]
pub struct ListSubscriptionsQuery {
    #[serde(rename = "activeOnly", default)]
    pub active_only: bool,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    Query(query): Query<ListSubscriptionsQuery>,
) -> Result<Json<Envelope<Vec<Subscription>>>, AppError> {
    let kernel = state.kernel(&tenant).await?;
    let subs = kernel.list_subscriptions(query.active_only).await?;
    Ok(Json(Envelope::ok(subs)))
}
