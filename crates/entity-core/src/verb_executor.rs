//! C6 — Verb executor.
//!
//! Coordinates schema validation (C3), entity mutation, event append (C5)
//! and hands the new event to the dispatchers (§4.5). Default verbs
//! (`create`/`update`/`delete`) bypass this and go to `EntityStore`
//! directly so their semantics stay fixed (§4.5 last line).

use std::sync::Arc;

use chrono::Utc;
use entity_types::{strip_reserved, EngineError, Entity, Event, HookPhase, Result};
use serde_json::Value;

use crate::document::merge;
use crate::ids::mint_event_id;
use crate::ports::StorageEngine;
use crate::schema_registry::SchemaRegistry;

const DEFAULT_VERBS: &[&str] = &["create", "update", "delete"];

pub struct VerbExecutor {
    storage: Arc<dyn StorageEngine>,
    schemas: Arc<SchemaRegistry>,
}

impl VerbExecutor {
    pub fn new(storage: Arc<dyn StorageEngine>, schemas: Arc<SchemaRegistry>) -> Self {
        Self { storage, schemas }
    }

    /// `execute(type, id, verb, payload)` (§4.5).
    pub async fn execute(
        &self,
        entity_type: &str,
        id: &str,
        verb: &str,
        payload: Value,
    ) -> Result<(Entity, Event)> {
        if DEFAULT_VERBS.contains(&verb) {
            return Err(EngineError::BadInput(format!(
                "verb '{verb}' is a default verb — call create/update/delete directly"
            )));
        }

        let noun = self
            .schemas
            .get_noun(entity_type)
            .await?
            .ok_or_else(|| EngineError::SchemaMissing(entity_type.to_string()))?;

        // A caller that names a verb's activity or event form instead of
        // its action form is redirected rather than treated as unknown.
        for (action_verb, conjugation) in &noun.verbs {
            if conjugation.activity == verb || conjugation.event == verb {
                return Err(EngineError::UseActionForm(
                    action_verb.clone(),
                    verb.to_string(),
                ));
            }
        }

        let conjugation = noun
            .verbs
            .get(verb)
            .cloned()
            .ok_or_else(|| EngineError::VerbUnknown(verb.to_string()))?;

        if noun.is_verb_disabled(verb) {
            return Err(EngineError::VerbDisabled(verb.to_string()));
        }

        let current = self
            .storage
            .get_entity(entity_type, id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("{entity_type}/{id}")))?;

        // Stored before-hooks are looked up for logging only — hook code
        // is never interpreted (§4.5, §9).
        let before_hook_count = self
            .schemas
            .list_hooks(Some(entity_type), Some(verb))
            .await?
            .into_iter()
            .filter(|h| h.phase == HookPhase::Before)
            .count();
        if before_hook_count > 0 {
            tracing::debug!(
                entity_type,
                verb,
                count = before_hook_count,
                "before-hooks registered for this verb — logged only, never executed"
            );
        }

        let patch = strip_reserved(payload);
        let now = Utc::now();
        let mut updated = current.clone();
        updated.payload = merge(&current.payload, &patch);
        updated.version = current.version + 1;
        updated.updated_at = now;

        let event = Event {
            id: mint_event_id(),
            event_type: Event::compose_type(entity_type, verb),
            entity_type: entity_type.to_string(),
            entity_id: id.to_string(),
            verb: verb.to_string(),
            conjugation,
            data: Some(patch),
            before: Some(current.to_document()),
            after: Some(updated.to_document()),
            sequence: updated.version,
            timestamp: now,
        };

        self.storage
            .commit_mutation(updated.clone(), event.clone())
            .await?;
        tracing::info!(
            entity_type,
            id,
            verb,
            sequence = event.sequence,
            "verb executed"
        );
        Ok((updated, event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;
    use crate::schema_registry::SchemaRegistry;
    use entity_types::NounDefinition;
    use serde_json::json;

    async fn executor_with_deal() -> (VerbExecutor, Arc<MemoryStorage>, Arc<SchemaRegistry>) {
        let storage = Arc::new(MemoryStorage::new("t1"));
        let schemas = Arc::new(SchemaRegistry::new(storage.clone()));
        let mut def = NounDefinition::default();
        def.verbs.push("close".into());
        def.verbs.push("qualify".into());
        schemas.define_noun("Deal", def).await.unwrap();
        (
            VerbExecutor::new(storage.clone(), schemas.clone()),
            storage,
            schemas,
        )
    }

    #[tokio::test]
    async fn execute_unknown_verb_rejected() {
        let (executor, storage, schemas) = executor_with_deal().await;
        let entity_store =
            crate::entity_store::EntityStore::new(storage.clone(), schemas.clone());
        let (entity, _) = entity_store
            .create("Deal", json!({}), "t", None)
            .await
            .unwrap();
        let err = executor
            .execute("Deal", &entity.id, "frobnicate", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::VerbUnknown(_)));
    }

    #[tokio::test]
    async fn execute_activity_form_redirects_to_action_form() {
        let (executor, storage, schemas) = executor_with_deal().await;
        let entity_store =
            crate::entity_store::EntityStore::new(storage.clone(), schemas.clone());
        let (entity, _) = entity_store
            .create("Deal", json!({}), "t", None)
            .await
            .unwrap();
        let err = executor
            .execute("Deal", &entity.id, "closing", json!({}))
            .await
            .unwrap_err();
        match err {
            EngineError::UseActionForm(action, given) => {
                assert_eq!(action, "close");
                assert_eq!(given, "closing");
            }
            other => panic!("expected UseActionForm, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn execute_custom_verb_appends_event_with_snapshots() {
        let (executor, storage, schemas) = executor_with_deal().await;
        let entity_store =
            crate::entity_store::EntityStore::new(storage.clone(), schemas.clone());
        let (entity, _) = entity_store
            .create("Deal", json!({"stage": "open"}), "t", None)
            .await
            .unwrap();
        let (updated, event) = executor
            .execute("Deal", &entity.id, "close", json!({"stage": "closed"}))
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(event.event_type, "Deal.close");
        assert_eq!(event.sequence, 2);
        assert!(event.before.is_some());
        assert!(event.after.is_some());
        assert_eq!(event.conjugation.event, "closed");
    }

    #[tokio::test]
    async fn execute_disabled_verb_rejected() {
        let storage = Arc::new(MemoryStorage::new("t1"));
        let schemas = Arc::new(SchemaRegistry::new(storage.clone()));
        let mut def = NounDefinition::default();
        def.verbs.push("close".into());
        def.disabled_verbs.insert("close".into());
        schemas.define_noun("Deal", def).await.unwrap();
        let entity_store = crate::entity_store::EntityStore::new(storage.clone(), schemas.clone());
        let (entity, _) = entity_store
            .create("Deal", json!({}), "t", None)
            .await
            .unwrap();
        let executor = VerbExecutor::new(storage, schemas);
        let err = executor
            .execute("Deal", &entity.id, "close", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::VerbDisabled(_)));
    }
}
