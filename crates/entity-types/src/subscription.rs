use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionMode {
    Webhook,
    Websocket,
}

/// A tenant-registered event subscription (§3, §4.8). `pattern` matches
/// against event `type` strings using the two-segment grammar described
/// in §4.8 / §9 Open Questions (no hierarchical globs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub pattern: String,
    pub mode: SubscriptionMode,
    pub endpoint: String,
    pub secret: Option<String>,
    pub active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
