//! C7 — Time-travel engine.
//!
//! Reconstructs entity state at a given sequence and/or timestamp by
//! folding its event history from scratch (§4.7), and computes
//! field-level diffs between two points.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use entity_types::{DiffResult, EngineError, Event, FieldChange, Result};
use serde_json::Value;

use crate::ports::StorageEngine;

/// Meta-fields excluded from `diff`'s field-level comparison — these
/// describe the row, not the payload, and always differ across versions
/// (§4.7 "compare non-meta keys").
const META_FIELDS: &[&str] = &[
    "id",
    "type",
    "version",
    "createdAt",
    "updatedAt",
    "deletedAt",
    "context",
];

#[derive(Debug, Clone, Default)]
pub struct ReconstructAt {
    pub as_of: Option<DateTime<Utc>>,
    pub at_version: Option<u64>,
}

pub struct TimeTravelEngine {
    storage: Arc<dyn StorageEngine>,
}

impl TimeTravelEngine {
    pub fn new(storage: Arc<dyn StorageEngine>) -> Self {
        Self { storage }
    }

    /// `reconstruct(type, id, {asOf, atVersion})` (§4.7). Folds events in
    /// `sequence` order; an event whose event-form is `deleted` marks the
    /// folded state deleted (still advancing `version`) rather than
    /// discarding it, so a reconstruction at or after the delete still
    /// shows the entity's last known fields.
    pub async fn reconstruct(
        &self,
        entity_type: &str,
        id: &str,
        at: &ReconstructAt,
    ) -> Result<Value> {
        let events = self.storage.history(entity_type, id).await?;
        let constrained: Vec<&Event> = events
            .iter()
            .filter(|e| at.at_version.map_or(true, |v| e.sequence <= v))
            .filter(|e| at.as_of.map_or(true, |ts| e.timestamp <= ts))
            .collect();

        let mut state: Option<serde_json::Map<String, Value>> = None;
        for event in &constrained {
            if event.conjugation.event == "deleted" {
                if let Some(map) = state.as_mut() {
                    map.insert(
                        "deletedAt".into(),
                        Value::String(event.timestamp.to_rfc3339()),
                    );
                    map.insert("version".into(), Value::Number(event.sequence.into()));
                }
                continue;
            }

            let mut merged = state.take().unwrap_or_default();
            if let Some(Value::Object(after_map)) = event.after.clone() {
                for (k, v) in after_map {
                    merged.insert(k, v);
                }
            }
            merged.insert("id".into(), Value::String(event.entity_id.clone()));
            merged.insert("type".into(), Value::String(event.entity_type.clone()));
            merged.insert("version".into(), Value::Number(event.sequence.into()));
            state = Some(merged);
        }

        state
            .map(Value::Object)
            .ok_or_else(|| EngineError::NotFound(format!("{entity_type}/{id}")))
    }

    /// `diff(type, id, from, to)` where `from < to` (§4.7).
    pub async fn diff(
        &self,
        entity_type: &str,
        id: &str,
        from: u64,
        to: u64,
    ) -> Result<DiffResult> {
        if from >= to {
            return Err(EngineError::BadInput(format!(
                "diff requires from < to, got from={from} to={to}"
            )));
        }

        let before_state = self
            .reconstruct(
                entity_type,
                id,
                &ReconstructAt {
                    as_of: None,
                    at_version: Some(from),
                },
            )
            .await?;
        let after_state = self
            .reconstruct(
                entity_type,
                id,
                &ReconstructAt {
                    as_of: None,
                    at_version: Some(to),
                },
            )
            .await?;

        let all_events = self.storage.history(entity_type, id).await?;
        let between: Vec<Event> = all_events
            .into_iter()
            .filter(|e| e.sequence > from && e.sequence <= to)
            .collect();

        Ok(DiffResult {
            changes: field_level_changes(&before_state, &after_state),
            events: between,
        })
    }
}

fn field_level_changes(before: &Value, after: &Value) -> Vec<FieldChange> {
    let empty = serde_json::Map::new();
    let before_map = before.as_object().unwrap_or(&empty);
    let after_map = after.as_object().unwrap_or(&empty);

    let mut keys: std::collections::BTreeSet<&String> = before_map.keys().collect();
    keys.extend(after_map.keys());

    keys.into_iter()
        .filter(|k| !k.starts_with('$') && !META_FIELDS.contains(&k.as_str()))
        .filter_map(|key| {
            let before_val = before_map.get(key);
            let after_val = after_map.get(key);
            if before_val == after_val {
                None
            } else {
                Some(FieldChange {
                    field: key.clone(),
                    from: before_val.cloned(),
                    to: after_val.cloned(),
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_store::EntityStore;
    use crate::memory::MemoryStorage;
    use crate::schema_registry::SchemaRegistry;
    use entity_types::NounDefinition;
    use serde_json::json;

    async fn store() -> (EntityStore, TimeTravelEngine) {
        let storage = Arc::new(MemoryStorage::new("t1"));
        let schemas = Arc::new(SchemaRegistry::new(storage.clone()));
        schemas
            .define_noun("Contact", NounDefinition::default())
            .await
            .unwrap();
        (
            EntityStore::new(storage.clone(), schemas),
            TimeTravelEngine::new(storage),
        )
    }

    #[tokio::test]
    async fn scenario_4_replay_and_diff() {
        let (entities, tt) = store().await;
        let (entity, _) = entities
            .create("Contact", json!({"stage": "Lead"}), "t", None)
            .await
            .unwrap();
        entities
            .update("Contact", &entity.id, json!({"stage": "Qualified"}), None)
            .await
            .unwrap();
        entities
            .update("Contact", &entity.id, json!({"stage": "Customer"}), None)
            .await
            .unwrap();

        let at2 = tt
            .reconstruct(
                "Contact",
                &entity.id,
                &ReconstructAt {
                    as_of: None,
                    at_version: Some(2),
                },
            )
            .await
            .unwrap();
        assert_eq!(at2["stage"], "Qualified");
        assert_eq!(at2["version"], 2);

        let diff = tt.diff("Contact", &entity.id, 1, 3).await.unwrap();
        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.changes[0].field, "stage");
        assert_eq!(diff.changes[0].from, Some(json!("Lead")));
        assert_eq!(diff.changes[0].to, Some(json!("Customer")));
        assert_eq!(diff.events.len(), 2);
    }

    #[tokio::test]
    async fn scenario_5_reconstruct_around_delete() {
        let (entities, tt) = store().await;
        let (entity, _) = entities
            .create("Contact", json!({"stage": "Lead"}), "t", None)
            .await
            .unwrap();
        entities.delete("Contact", &entity.id).await.unwrap();

        let pre_delete = tt
            .reconstruct(
                "Contact",
                &entity.id,
                &ReconstructAt {
                    as_of: None,
                    at_version: Some(1),
                },
            )
            .await
            .unwrap();
        assert_eq!(pre_delete["deletedAt"], Value::Null);

        let post_delete = tt
            .reconstruct("Contact", &entity.id, &ReconstructAt::default())
            .await
            .unwrap();
        assert_ne!(post_delete["deletedAt"], Value::Null);
        assert_eq!(post_delete["version"], 2);
    }

    #[tokio::test]
    async fn reconstruct_with_no_events_is_not_found() {
        let (_entities, tt) = store().await;
        let err = tt
            .reconstruct("Contact", "contact_doesnotexist", &ReconstructAt::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn diff_rejects_from_greater_or_equal_to() {
        let (entities, tt) = store().await;
        let (entity, _) = entities
            .create("Contact", json!({}), "t", None)
            .await
            .unwrap();
        let err = tt.diff("Contact", &entity.id, 2, 1).await.unwrap_err();
        assert!(matches!(err, EngineError::BadInput(_)));
    }
}
