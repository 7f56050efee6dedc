use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::noun::Conjugation;

/// An immutable append-only event record (§3 Event). Never mutated or
/// deleted once written (E1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(rename = "entityType")]
    pub entity_type: String,
    #[serde(rename = "entityId")]
    pub entity_id: String,
    pub verb: String,
    pub conjugation: Conjugation,
    pub data: Option<serde_json::Value>,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn compose_type(entity_type: &str, verb: &str) -> String {
        format!("{entity_type}.{verb}")
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub since: Option<DateTime<Utc>>,
    pub event_type: Option<String>,
    pub entity_id: Option<String>,
    pub verb: Option<String>,
    pub limit: u32,
}

/// Cursor-filterable, ordered CDC query parameters (§4.10).
#[derive(Debug, Clone, Default)]
pub struct CdcQuery {
    pub since: Option<String>,
    pub types: Vec<String>,
    pub verbs: Vec<String>,
}

/// A field-level difference produced by the time-travel diff operation
/// (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub from: Option<serde_json::Value>,
    pub to: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffResult {
    pub changes: Vec<FieldChange>,
    pub events: Vec<Event>,
}
