use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored entity document. Meta-fields live alongside the opaque
/// payload (§3 Entity). Invariants I1-I5 are enforced by the entity
/// store (C4), not by this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub payload: serde_json::Value,
    pub version: u64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "deletedAt")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub context: String,
}

impl Entity {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Renders the full row as the JSON document callers see — meta fields
    /// plus payload keys merged, matching how `before`/`after` event
    /// snapshots are constructed.
    pub fn to_document(&self) -> serde_json::Value {
        let mut doc = match &self.payload {
            serde_json::Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        doc.insert("id".into(), serde_json::Value::String(self.id.clone()));
        doc.insert(
            "type".into(),
            serde_json::Value::String(self.entity_type.clone()),
        );
        doc.insert(
            "version".into(),
            serde_json::Value::Number(self.version.into()),
        );
        doc.insert(
            "createdAt".into(),
            serde_json::Value::String(self.created_at.to_rfc3339()),
        );
        doc.insert(
            "updatedAt".into(),
            serde_json::Value::String(self.updated_at.to_rfc3339()),
        );
        doc.insert(
            "deletedAt".into(),
            match self.deleted_at {
                Some(t) => serde_json::Value::String(t.to_rfc3339()),
                None => serde_json::Value::Null,
            },
        );
        doc.insert(
            "context".into(),
            serde_json::Value::String(self.context.clone()),
        );
        serde_json::Value::Object(doc)
    }
}

/// Reserved meta-field names stripped from any incoming patch/payload
/// before merge (used by update, delete and verb execution alike).
pub const RESERVED_FIELDS: &[&str] = &["id", "type", "context", "createdAt", "version"];

pub fn strip_reserved(mut payload: serde_json::Value) -> serde_json::Value {
    if let serde_json::Value::Object(map) = &mut payload {
        for field in RESERVED_FIELDS {
            map.remove(*field);
        }
    }
    payload
}

/// Equality-only filter for `list` — flat field → value map, AND-combined,
/// pushed down into the storage query (§4.4).
pub type Filter = std::collections::HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: "createdAt".into(),
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub filter: Filter,
    pub sort: Option<Sort>,
    pub limit: u32,
    pub offset: u32,
}

pub const MAX_LIST_LIMIT: u32 = 1000;
pub const DEFAULT_LIST_LIMIT: u32 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}
