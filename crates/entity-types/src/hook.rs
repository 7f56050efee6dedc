use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookPhase {
    Before,
    After,
}

/// A stored verb-hook registration. `code` is stored verbatim and never
/// evaluated — preserving that posture is a hard requirement (§9, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookRegistration {
    pub noun: String,
    pub verb: String,
    pub phase: HookPhase,
    pub code: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
