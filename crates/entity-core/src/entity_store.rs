//! C4 — Entity store.
//!
//! Inserts, reads, updates and soft-deletes entities; enforces optimistic
//! concurrency; filter/sort is pushed down into the storage query (§4.4).
//! Every mutation here commits through `StorageEngine::commit_mutation`
//! so the (entity, event) pair lands atomically (§4.6).

use std::sync::Arc;

use chrono::Utc;
use entity_types::{
    strip_reserved, Conjugation, EngineError, Entity, Event, ListParams, ListResult,
    Result, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};
use serde_json::Value;

use crate::document::merge;
use crate::ids::mint_entity_id;
use crate::ids::mint_event_id;
use crate::ports::StorageEngine;
use crate::schema_registry::SchemaRegistry;

pub struct EntityStore {
    storage: Arc<dyn StorageEngine>,
    schemas: Arc<SchemaRegistry>,
}

impl EntityStore {
    pub fn new(storage: Arc<dyn StorageEngine>, schemas: Arc<SchemaRegistry>) -> Self {
        Self { storage, schemas }
    }

    async fn conjugation_for(&self, entity_type: &str, verb: &str) -> Result<Conjugation> {
        let noun = self
            .schemas
            .get_noun(entity_type)
            .await?
            .ok_or_else(|| EngineError::SchemaMissing(entity_type.to_string()))?;
        noun.verbs
            .get(verb)
            .cloned()
            .ok_or_else(|| EngineError::VerbUnknown(verb.to_string()))
    }

    /// `create(type, payload, contextUrl)` (§4.4).
    pub async fn create(
        &self,
        entity_type: &str,
        payload: Value,
        context: &str,
        id: Option<String>,
    ) -> Result<(Entity, Event)> {
        let noun = self
            .schemas
            .get_noun(entity_type)
            .await?
            .ok_or_else(|| EngineError::SchemaMissing(entity_type.to_string()))?;
        if noun.is_verb_disabled("create") {
            return Err(EngineError::VerbDisabled("create".to_string()));
        }

        let now = Utc::now();
        let entity = Entity {
            id: id.unwrap_or_else(|| mint_entity_id(entity_type)),
            entity_type: entity_type.to_string(),
            payload: strip_reserved(payload),
            version: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            context: context.to_string(),
        };

        let conjugation = noun
            .verbs
            .get("create")
            .cloned()
            .unwrap_or_else(|| crate::conjugator::conjugate("create"));

        let event = Event {
            id: mint_event_id(),
            event_type: Event::compose_type(entity_type, "create"),
            entity_type: entity_type.to_string(),
            entity_id: entity.id.clone(),
            verb: "create".to_string(),
            conjugation,
            data: Some(entity.payload.clone()),
            before: None,
            after: Some(entity.to_document()),
            sequence: 1,
            timestamp: now,
        };

        self.storage.commit_mutation(entity.clone(), event.clone()).await?;
        Ok((entity, event))
    }

    /// `get(type, id)` — `deletedAt` is filtered out at query time (I4).
    pub async fn get(&self, entity_type: &str, id: &str) -> Result<Entity> {
        self.storage
            .get_entity(entity_type, id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("{entity_type}/{id}")))
    }

    pub async fn list(&self, entity_type: &str, mut params: ListParams) -> Result<ListResult<Entity>> {
        if params.limit == 0 {
            params.limit = DEFAULT_LIST_LIMIT;
        }
        params.limit = params.limit.min(MAX_LIST_LIMIT);
        self.storage.list_entities(entity_type, &params).await
    }

    /// `update(type, id, patch, expectedVersion?)` (§4.4).
    pub async fn update(
        &self,
        entity_type: &str,
        id: &str,
        patch: Value,
        expected_version: Option<u64>,
    ) -> Result<(Entity, Event)> {
        let noun = self
            .schemas
            .get_noun(entity_type)
            .await?
            .ok_or_else(|| EngineError::SchemaMissing(entity_type.to_string()))?;
        if noun.is_verb_disabled("update") {
            return Err(EngineError::VerbDisabled("update".to_string()));
        }

        let current = self.get(entity_type, id).await?;

        if let Some(expected) = expected_version {
            if expected != current.version {
                return Err(EngineError::VersionConflict {
                    expected,
                    current: current.version,
                });
            }
        }

        let patch = strip_reserved(patch);
        let now = Utc::now();
        let mut updated = current.clone();
        updated.payload = merge(&current.payload, &patch);
        updated.version = current.version + 1;
        updated.updated_at = now;

        let conjugation = noun
            .verbs
            .get("update")
            .cloned()
            .unwrap_or_else(|| crate::conjugator::conjugate("update"));

        let event = Event {
            id: mint_event_id(),
            event_type: Event::compose_type(entity_type, "update"),
            entity_type: entity_type.to_string(),
            entity_id: id.to_string(),
            verb: "update".to_string(),
            conjugation,
            data: Some(patch),
            before: Some(current.to_document()),
            after: Some(updated.to_document()),
            sequence: updated.version,
            timestamp: now,
        };

        self.storage.commit_mutation(updated.clone(), event.clone()).await?;
        Ok((updated, event))
    }

    /// `delete(type, id)` — soft delete, idempotent only at the API level
    /// (a second call returns `NotFound`, no second event) (§4.4).
    pub async fn delete(&self, entity_type: &str, id: &str) -> Result<(Entity, Event)> {
        let noun = self
            .schemas
            .get_noun(entity_type)
            .await?
            .ok_or_else(|| EngineError::SchemaMissing(entity_type.to_string()))?;
        if noun.is_verb_disabled("delete") {
            return Err(EngineError::VerbDisabled("delete".to_string()));
        }

        let current = self.get(entity_type, id).await?;

        let now = Utc::now();
        let mut deleted = current.clone();
        deleted.deleted_at = Some(now);
        deleted.version = current.version + 1;
        deleted.updated_at = now;

        let conjugation = noun
            .verbs
            .get("delete")
            .cloned()
            .unwrap_or_else(|| crate::conjugator::conjugate("delete"));

        let event = Event {
            id: mint_event_id(),
            event_type: Event::compose_type(entity_type, "delete"),
            entity_type: entity_type.to_string(),
            entity_id: id.to_string(),
            verb: "delete".to_string(),
            conjugation,
            data: None,
            before: Some(current.to_document()),
            after: None,
            sequence: deleted.version,
            timestamp: now,
        };

        self.storage.commit_mutation(deleted.clone(), event.clone()).await?;
        Ok((deleted, event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;
    use entity_types::{Filter, NounDefinition, Sort, SortDirection};
    use serde_json::json;

    async fn store_with_contact() -> EntityStore {
        let storage = Arc::new(MemoryStorage::new("t1"));
        let schemas = Arc::new(SchemaRegistry::new(storage.clone()));
        schemas.define_noun("Contact", NounDefinition::default()).await.unwrap();
        EntityStore::new(storage, schemas)
    }

    #[tokio::test]
    async fn scenario_1_define_and_create() {
        let store = store_with_contact().await;
        let (entity, event) = store
            .create(
                "Contact",
                json!({"name": "Alice", "email": "a@x", "stage": "Lead"}),
                "tenant://t1",
                None,
            )
            .await
            .unwrap();
        assert_eq!(entity.version, 1);
        assert!(entity.id.starts_with("contact_"));
        assert_eq!(event.sequence, 1);
        assert_eq!(event.event_type, "Contact.create");
        assert!(event.before.is_none());
    }

    #[tokio::test]
    async fn create_fails_on_undefined_noun() {
        let storage = Arc::new(MemoryStorage::new("t1"));
        let schemas = Arc::new(SchemaRegistry::new(storage.clone()));
        let store = EntityStore::new(storage, schemas);
        let err = store
            .create("Deal", json!({}), "tenant://t1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SchemaMissing(_)));
    }

    #[tokio::test]
    async fn scenario_2_optimistic_concurrency() {
        let store = store_with_contact().await;
        let (entity, _) = store
            .create("Contact", json!({"stage": "Lead"}), "tenant://t1", None)
            .await
            .unwrap();

        let ok = store
            .update("Contact", &entity.id, json!({"stage": "Qualified"}), Some(1))
            .await;
        assert!(ok.is_ok());
        assert_eq!(ok.unwrap().0.version, 2);

        let conflict = store
            .update("Contact", &entity.id, json!({"stage": "Customer"}), Some(1))
            .await
            .unwrap_err();
        match conflict {
            EngineError::VersionConflict { expected, current } => {
                assert_eq!(expected, 1);
                assert_eq!(current, 2);
            }
            other => panic!("expected VersionConflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn scenario_3_filter_beyond_limit() {
        let store = store_with_contact().await;
        for _ in 0..95 {
            store
                .create("Contact", json!({"stage": "Customer"}), "t", None)
                .await
                .unwrap();
        }
        for _ in 0..5 {
            store
                .create("Contact", json!({"stage": "Lead"}), "t", None)
                .await
                .unwrap();
        }

        let mut filter = Filter::new();
        filter.insert("stage".to_string(), json!("Lead"));
        let params = ListParams {
            filter,
            sort: Some(Sort {
                field: "createdAt".into(),
                direction: SortDirection::Desc,
            }),
            limit: 10,
            offset: 0,
        };
        let result = store.list("Contact", params).await.unwrap();
        assert_eq!(result.items.len(), 5);
        assert!(result.items.iter().all(|e| e.payload["stage"] == "Lead"));
        assert_eq!(result.total, 5);
        assert!(!result.has_more);
    }

    #[tokio::test]
    async fn scenario_5_soft_delete_then_not_found() {
        let store = store_with_contact().await;
        let (entity, _) = store
            .create("Contact", json!({"stage": "Lead"}), "t", None)
            .await
            .unwrap();
        store.delete("Contact", &entity.id).await.unwrap();
        let err = store.get("Contact", &entity.id).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        let second = store.delete("Contact", &entity.id).await.unwrap_err();
        assert!(matches!(second, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_strips_reserved_fields_from_patch() {
        let store = store_with_contact().await;
        let (entity, _) = store
            .create("Contact", json!({"stage": "Lead"}), "t", None)
            .await
            .unwrap();
        let (updated, _) = store
            .update(
                "Contact",
                &entity.id,
                json!({"id": "hacked", "version": 999, "stage": "Qualified"}),
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.id, entity.id);
        assert_eq!(updated.version, 2);
        assert_eq!(updated.payload["stage"], "Qualified");
    }
}
