//! Reference in-memory `StorageEngine`. Used by this crate's own test
//! suite and suitable for embedding the kernel without a database. The
//! PostgreSQL adapter (`entity-postgres`) implements the same trait for
//! production use.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use entity_types::{
    DispatchLogEntry, Entity, EngineError, Event, EventQuery, HookRegistration, IntegrationHook,
    ListParams, ListResult, NounSchema, RelationshipEdge, Result, Subscription, TenantMetadata,
    TenantStatus,
};

use crate::document::{compare_by_field, matches_filter};
use crate::ports::StorageEngine;

pub struct MemoryStorage {
    nouns: RwLock<HashMap<String, NounSchema>>,
    entities: RwLock<HashMap<(String, String), Entity>>,
    events: RwLock<Vec<Event>>,
    relationships: RwLock<Vec<RelationshipEdge>>,
    hooks: RwLock<Vec<HookRegistration>>,
    subscriptions: RwLock<HashMap<String, Subscription>>,
    integration_hooks: RwLock<HashMap<String, IntegrationHook>>,
    dispatch_log: RwLock<Vec<DispatchLogEntry>>,
    tenant_meta: RwLock<TenantMetadata>,
}

impl MemoryStorage {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            nouns: RwLock::new(HashMap::new()),
            entities: RwLock::new(HashMap::new()),
            events: RwLock::new(Vec::new()),
            relationships: RwLock::new(Vec::new()),
            hooks: RwLock::new(Vec::new()),
            subscriptions: RwLock::new(HashMap::new()),
            integration_hooks: RwLock::new(HashMap::new()),
            dispatch_log: RwLock::new(Vec::new()),
            tenant_meta: RwLock::new(TenantMetadata {
                tenant_id: tenant_id.into(),
                status: TenantStatus::Active,
                created_at: Utc::now(),
                name: None,
                plan: None,
                deactivated_at: None,
            }),
        }
    }

    fn rlock_poisoned() -> EngineError {
        EngineError::Internal("in-memory storage lock poisoned".into())
    }
}

#[async_trait]
impl StorageEngine for MemoryStorage {
    async fn get_noun(&self, name: &str) -> Result<Option<NounSchema>> {
        let nouns = self.nouns.read().map_err(|_| Self::rlock_poisoned())?;
        Ok(nouns.get(name).cloned())
    }

    async fn list_nouns(&self) -> Result<Vec<NounSchema>> {
        let nouns = self.nouns.read().map_err(|_| Self::rlock_poisoned())?;
        Ok(nouns.values().cloned().collect())
    }

    async fn put_noun(&self, schema: NounSchema) -> Result<()> {
        let mut nouns = self.nouns.write().map_err(|_| Self::rlock_poisoned())?;
        nouns.insert(schema.name.clone(), schema);
        Ok(())
    }

    async fn get_entity(&self, entity_type: &str, id: &str) -> Result<Option<Entity>> {
        let entities = self.entities.read().map_err(|_| Self::rlock_poisoned())?;
        Ok(entities
            .get(&(entity_type.to_string(), id.to_string()))
            .filter(|e| !e.is_deleted())
            .cloned())
    }

    async fn list_entities(
        &self,
        entity_type: &str,
        params: &ListParams,
    ) -> Result<ListResult<Entity>> {
        let entities = self.entities.read().map_err(|_| Self::rlock_poisoned())?;
        let mut matched: Vec<Entity> = entities
            .values()
            .filter(|e| e.entity_type == entity_type && !e.is_deleted())
            .filter(|e| matches_filter(e, &params.filter))
            .cloned()
            .collect();

        let total = matched.len() as u64;

        let sort = params.sort.clone().unwrap_or_default();
        matched.sort_by(|a, b| {
            let ord = compare_by_field(a, b, &sort.field);
            match sort.direction {
                entity_types::SortDirection::Asc => ord,
                entity_types::SortDirection::Desc => ord.reverse(),
            }
        });

        let offset = params.offset as usize;
        let limit = params.limit as usize;
        let page: Vec<Entity> = matched.into_iter().skip(offset).take(limit).collect();
        let has_more = (offset + page.len()) < total as usize;

        Ok(ListResult {
            items: page,
            total,
            limit: params.limit,
            offset: params.offset,
            has_more,
        })
    }

    async fn max_sequence(&self, entity_type: &str, entity_id: &str) -> Result<u64> {
        let events = self.events.read().map_err(|_| Self::rlock_poisoned())?;
        Ok(events
            .iter()
            .filter(|e| e.entity_type == entity_type && e.entity_id == entity_id)
            .map(|e| e.sequence)
            .max()
            .unwrap_or(0))
    }

    async fn commit_mutation(&self, entity: Entity, event: Event) -> Result<()> {
        let mut entities = self.entities.write().map_err(|_| Self::rlock_poisoned())?;
        let mut events = self.events.write().map_err(|_| Self::rlock_poisoned())?;
        entities.insert((entity.entity_type.clone(), entity.id.clone()), entity);
        events.push(event);
        Ok(())
    }

    async fn get_event(&self, id: &str) -> Result<Option<Event>> {
        let events = self.events.read().map_err(|_| Self::rlock_poisoned())?;
        Ok(events.iter().find(|e| e.id == id).cloned())
    }

    async fn query_events(&self, query: &EventQuery) -> Result<Vec<Event>> {
        let events = self.events.read().map_err(|_| Self::rlock_poisoned())?;
        let mut matched: Vec<Event> = events
            .iter()
            .filter(|e| query.since.map_or(true, |since| e.timestamp >= since))
            .filter(|e| query.event_type.as_deref().map_or(true, |t| e.event_type == t))
            .filter(|e| query.entity_id.as_deref().map_or(true, |id| e.entity_id == id))
            .filter(|e| query.verb.as_deref().map_or(true, |v| e.verb == v))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let limit = query.limit.max(1).min(1000) as usize;
        matched.truncate(limit);
        Ok(matched)
    }

    async fn history(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Event>> {
        let events = self.events.read().map_err(|_| Self::rlock_poisoned())?;
        let mut matched: Vec<Event> = events
            .iter()
            .filter(|e| e.entity_type == entity_type && e.entity_id == entity_id)
            .cloned()
            .collect();
        matched.sort_by_key(|e| e.sequence);
        Ok(matched)
    }

    async fn cdc_events(
        &self,
        since_ts_exclusive: Option<DateTime<Utc>>,
        since_id: Option<&str>,
    ) -> Result<Vec<Event>> {
        let events = self.events.read().map_err(|_| Self::rlock_poisoned())?;
        let mut matched: Vec<Event> = match since_ts_exclusive {
            None => events.clone(),
            Some(ts) => events
                .iter()
                .filter(|e| {
                    e.timestamp > ts
                        || (e.timestamp == ts
                            && since_id.map_or(true, |id| e.id.as_str() > id))
                })
                .cloned()
                .collect(),
        };
        matched.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(matched)
    }

    async fn link(&self, edge: RelationshipEdge) -> Result<()> {
        let mut rels = self.relationships.write().map_err(|_| Self::rlock_poisoned())?;
        if !rels
            .iter()
            .any(|e| e.subject == edge.subject && e.predicate == edge.predicate && e.object == edge.object)
        {
            rels.push(edge);
        }
        Ok(())
    }

    async fn unlink(&self, subject: &str, predicate: &str, object: &str) -> Result<()> {
        let mut rels = self.relationships.write().map_err(|_| Self::rlock_poisoned())?;
        rels.retain(|e| !(e.subject == subject && e.predicate == predicate && e.object == object));
        Ok(())
    }

    async fn forward(&self, subject: &str, predicate: &str) -> Result<Vec<RelationshipEdge>> {
        let rels = self.relationships.read().map_err(|_| Self::rlock_poisoned())?;
        Ok(rels
            .iter()
            .filter(|e| e.subject == subject && e.predicate == predicate)
            .cloned()
            .collect())
    }

    async fn reverse(&self, object: &str, predicate: &str) -> Result<Vec<RelationshipEdge>> {
        let rels = self.relationships.read().map_err(|_| Self::rlock_poisoned())?;
        Ok(rels
            .iter()
            .filter(|e| e.object == object && e.predicate == predicate)
            .cloned()
            .collect())
    }

    async fn register_hook(&self, hook: HookRegistration) -> Result<()> {
        let mut hooks = self.hooks.write().map_err(|_| Self::rlock_poisoned())?;
        hooks.push(hook);
        Ok(())
    }

    async fn list_hooks(&self, noun: Option<&str>, verb: Option<&str>) -> Result<Vec<HookRegistration>> {
        let hooks = self.hooks.read().map_err(|_| Self::rlock_poisoned())?;
        Ok(hooks
            .iter()
            .filter(|h| noun.map_or(true, |n| h.noun == n))
            .filter(|h| verb.map_or(true, |v| h.verb == v))
            .cloned()
            .collect())
    }

    async fn create_subscription(&self, sub: Subscription) -> Result<()> {
        let mut subs = self.subscriptions.write().map_err(|_| Self::rlock_poisoned())?;
        subs.insert(sub.id.clone(), sub);
        Ok(())
    }

    async fn list_subscriptions(&self, active_only: bool) -> Result<Vec<Subscription>> {
        let subs = self.subscriptions.read().map_err(|_| Self::rlock_poisoned())?;
        Ok(subs
            .values()
            .filter(|s| !active_only || s.active)
            .cloned()
            .collect())
    }

    async fn get_subscription(&self, id: &str) -> Result<Option<Subscription>> {
        let subs = self.subscriptions.read().map_err(|_| Self::rlock_poisoned())?;
        Ok(subs.get(id).cloned())
    }

    async fn create_integration_hook(&self, hook: IntegrationHook) -> Result<()> {
        let mut hooks = self.integration_hooks.write().map_err(|_| Self::rlock_poisoned())?;
        hooks.insert(hook.id.clone(), hook);
        Ok(())
    }

    async fn list_integration_hooks(&self) -> Result<Vec<IntegrationHook>> {
        let hooks = self.integration_hooks.read().map_err(|_| Self::rlock_poisoned())?;
        Ok(hooks.values().cloned().collect())
    }

    async fn append_dispatch_log(&self, entry: DispatchLogEntry) -> Result<()> {
        let mut log = self.dispatch_log.write().map_err(|_| Self::rlock_poisoned())?;
        log.push(entry);
        Ok(())
    }

    async fn list_dispatch_log(&self, event_id: Option<&str>) -> Result<Vec<DispatchLogEntry>> {
        let log = self.dispatch_log.read().map_err(|_| Self::rlock_poisoned())?;
        Ok(log
            .iter()
            .filter(|d| event_id.map_or(true, |id| d.event_id == id))
            .cloned()
            .collect())
    }

    async fn get_tenant_meta(&self) -> Result<TenantMetadata> {
        let meta = self.tenant_meta.read().map_err(|_| Self::rlock_poisoned())?;
        Ok(meta.clone())
    }

    async fn put_tenant_meta(&self, meta: TenantMetadata) -> Result<()> {
        let mut guard = self.tenant_meta.write().map_err(|_| Self::rlock_poisoned())?;
        *guard = meta;
        Ok(())
    }
}
