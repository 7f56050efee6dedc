use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The named downstream service a hook dispatches to (§3, §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IntegrationService {
    Payments,
    Repo,
    Integrations,
    Oauth,
    Events,
}

impl IntegrationService {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payments => "PAYMENTS",
            Self::Repo => "REPO",
            Self::Integrations => "INTEGRATIONS",
            Self::Oauth => "OAUTH",
            Self::Events => "EVENTS",
        }
    }
}

/// A tenant-configured (or built-in) integration hook. Built-ins are
/// augmented at dispatch time and flagged `builtin: true`; they cannot be
/// deleted (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationHook {
    pub id: String,
    #[serde(rename = "entityType")]
    pub entity_type: String,
    pub verb: String,
    pub service: IntegrationService,
    pub method: String,
    pub config: Option<serde_json::Value>,
    pub active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub builtin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Success,
    Error,
}

/// One completed integration-dispatch attempt (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchLogEntry {
    pub id: String,
    #[serde(rename = "eventId")]
    pub event_id: String,
    #[serde(rename = "hookId")]
    pub hook_id: String,
    pub service: String,
    pub method: String,
    pub status: DispatchStatus,
    #[serde(rename = "statusCode")]
    pub status_code: Option<u16>,
    pub error: Option<String>,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}
