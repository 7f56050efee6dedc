//! C11 — Tenant kernel.
//!
//! Bundles C3-C10 behind one per-tenant instance with exclusive ownership
//! of a local storage engine (§4.11). A single `tokio::sync::Mutex`
//! serializes mutation so each kernel is one serial actor (§5); dispatch
//! is spawned after the critical section releases so it never blocks the
//! caller and its errors never propagate back (§4.9 last line, §7).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use entity_types::{
    DiffResult, DispatchLogEntry, Entity, Event, IntegrationHook, IntegrationService, ListParams,
    ListResult, NounDefinition, NounSchema, Result, Subscription, SubscriptionMode,
    TenantMetadata, TenantStatus,
};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::cdc::CdcStream;
use crate::config::KernelConfig;
use crate::entity_store::EntityStore;
use crate::ids::{mint_hook_id, mint_subscription_id};
use crate::integration_dispatcher::{IntegrationDispatcher, ServiceBinding};
use crate::ports::StorageEngine;
use crate::relationships::RelationshipStore;
use crate::schema_registry::SchemaRegistry;
use crate::subscription_dispatcher::SubscriptionDispatcher;
use crate::time_travel::{ReconstructAt, TimeTravelEngine};
use crate::verb_executor::VerbExecutor;

pub struct TenantKernel {
    tenant_id: String,
    storage: Arc<dyn StorageEngine>,
    schemas: Arc<SchemaRegistry>,
    entities: EntityStore,
    verbs: VerbExecutor,
    time_travel: TimeTravelEngine,
    relationships: RelationshipStore,
    cdc: CdcStream,
    subscriptions: Arc<SubscriptionDispatcher>,
    integrations: Arc<IntegrationDispatcher>,
    /// Guards every mutating operation so the kernel behaves as a single
    /// serial actor (§5). Reads are not guarded — storage already filters
    /// soft-deleted rows and each read is self-consistent.
    write_lock: Mutex<()>,
}

impl TenantKernel {
    pub fn new(
        tenant_id: impl Into<String>,
        storage: Arc<dyn StorageEngine>,
        config: KernelConfig,
        service_bindings: HashMap<IntegrationService, Arc<dyn ServiceBinding>>,
    ) -> Self {
        let schemas = Arc::new(SchemaRegistry::new(storage.clone()));
        Self {
            tenant_id: tenant_id.into(),
            storage: storage.clone(),
            schemas: schemas.clone(),
            entities: EntityStore::new(storage.clone(), schemas.clone()),
            verbs: VerbExecutor::new(storage.clone(), schemas.clone()),
            time_travel: TimeTravelEngine::new(storage.clone()),
            relationships: RelationshipStore::new(storage.clone()),
            cdc: CdcStream::new(storage.clone()),
            subscriptions: Arc::new(SubscriptionDispatcher::new(&config)),
            integrations: Arc::new(IntegrationDispatcher::new(storage, service_bindings)),
            write_lock: Mutex::new(()),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn relationships(&self) -> &RelationshipStore {
        &self.relationships
    }

    pub fn cdc(&self) -> &CdcStream {
        &self.cdc
    }

    // ---- C3 schema registry ----

    pub async fn define_noun(&self, name: &str, definition: NounDefinition) -> Result<NounSchema> {
        self.schemas.define_noun(name, definition).await
    }

    pub async fn list_nouns(&self) -> Result<Vec<NounSchema>> {
        self.schemas.list_nouns().await
    }

    pub async fn get_noun(&self, name: &str) -> Result<Option<NounSchema>> {
        self.schemas.get_noun(name).await
    }

    // ---- C4 entity store (default verbs) ----

    pub async fn create(&self, entity_type: &str, payload: Value, context: &str) -> Result<Entity> {
        let _guard = self.write_lock.lock().await;
        let (entity, event) = self
            .entities
            .create(entity_type, payload, context, None)
            .await?;
        self.fan_out(event, context.to_string());
        Ok(entity)
    }

    pub async fn get(&self, entity_type: &str, id: &str) -> Result<Entity> {
        self.entities.get(entity_type, id).await
    }

    pub async fn list(&self, entity_type: &str, params: ListParams) -> Result<ListResult<Entity>> {
        self.entities.list(entity_type, params).await
    }

    pub async fn update(
        &self,
        entity_type: &str,
        id: &str,
        patch: Value,
        expected_version: Option<u64>,
    ) -> Result<Entity> {
        let _guard = self.write_lock.lock().await;
        let context = self.entities.get(entity_type, id).await?.context;
        let (entity, event) = self
            .entities
            .update(entity_type, id, patch, expected_version)
            .await?;
        self.fan_out(event, context);
        Ok(entity)
    }

    pub async fn delete(&self, entity_type: &str, id: &str) -> Result<Entity> {
        let _guard = self.write_lock.lock().await;
        let context = self.entities.get(entity_type, id).await?.context;
        let (entity, event) = self.entities.delete(entity_type, id).await?;
        self.fan_out(event, context);
        Ok(entity)
    }

    // ---- C6 verb executor (custom verbs) ----

    pub async fn execute(
        &self,
        entity_type: &str,
        id: &str,
        verb: &str,
        payload: Value,
    ) -> Result<(Entity, Event)> {
        let _guard = self.write_lock.lock().await;
        let context = self.entities.get(entity_type, id).await?.context;
        let (entity, event) = self.verbs.execute(entity_type, id, verb, payload).await?;
        self.fan_out(event.clone(), context);
        Ok((entity, event))
    }

    // ---- C5 event log ----

    pub async fn history(&self, entity_type: &str, id: &str) -> Result<Vec<Event>> {
        self.storage.history(entity_type, id).await
    }

    pub async fn query_events(&self, query: &entity_types::EventQuery) -> Result<Vec<Event>> {
        self.storage.query_events(query).await
    }

    pub async fn get_event(&self, id: &str) -> Result<Event> {
        self.storage
            .get_event(id)
            .await?
            .ok_or_else(|| entity_types::EngineError::NotFound(format!("event/{id}")))
    }

    // ---- C7 time travel ----

    pub async fn reconstruct(&self, entity_type: &str, id: &str, at: ReconstructAt) -> Result<Value> {
        self.time_travel.reconstruct(entity_type, id, &at).await
    }

    pub async fn diff(&self, entity_type: &str, id: &str, from: u64, to: u64) -> Result<DiffResult> {
        self.time_travel.diff(entity_type, id, from, to).await
    }

    // ---- C8 subscriptions ----

    pub async fn create_subscription(
        &self,
        pattern: String,
        mode: SubscriptionMode,
        endpoint: String,
        secret: Option<String>,
    ) -> Result<Subscription> {
        let sub = Subscription {
            id: mint_subscription_id(),
            pattern,
            mode,
            endpoint,
            secret,
            active: true,
            created_at: Utc::now(),
        };
        self.storage.create_subscription(sub.clone()).await?;
        Ok(sub)
    }

    pub async fn list_subscriptions(&self, active_only: bool) -> Result<Vec<Subscription>> {
        self.storage.list_subscriptions(active_only).await
    }

    // ---- C9 integration hooks ----

    pub async fn register_integration_hook(
        &self,
        entity_type: String,
        verb: String,
        service: IntegrationService,
        method: String,
        config: Option<Value>,
    ) -> Result<IntegrationHook> {
        let hook = IntegrationHook {
            id: mint_hook_id(),
            entity_type,
            verb,
            service,
            method,
            config,
            active: true,
            created_at: Utc::now(),
            builtin: false,
        };
        self.storage.create_integration_hook(hook.clone()).await?;
        Ok(hook)
    }

    pub async fn list_integration_hooks(&self) -> Result<Vec<IntegrationHook>> {
        self.integrations.list_hooks().await
    }

    pub async fn list_dispatch_log(&self, event_id: Option<&str>) -> Result<Vec<DispatchLogEntry>> {
        self.storage.list_dispatch_log(event_id).await
    }

    // ---- hooks (supplemented, §3/§9) ----

    pub async fn register_hook(&self, hook: entity_types::HookRegistration) -> Result<()> {
        self.schemas.register_hook(hook).await
    }

    pub async fn list_hooks(
        &self,
        noun: Option<&str>,
        verb: Option<&str>,
    ) -> Result<Vec<entity_types::HookRegistration>> {
        self.schemas.list_hooks(noun, verb).await
    }

    // ---- tenant metadata / lifecycle (§4.11) ----

    pub async fn status(&self) -> Result<TenantMetadata> {
        self.storage.get_tenant_meta().await
    }

    pub async fn deactivate(&self) -> Result<TenantMetadata> {
        let mut meta = self.storage.get_tenant_meta().await?;
        meta.status = TenantStatus::Deactivated;
        meta.deactivated_at = Some(Utc::now());
        self.storage.put_tenant_meta(meta.clone()).await?;
        tracing::info!(tenant_id = %self.tenant_id, "tenant deactivated");
        Ok(meta)
    }

    pub async fn reactivate(&self) -> Result<TenantMetadata> {
        let mut meta = self.storage.get_tenant_meta().await?;
        meta.status = TenantStatus::Active;
        meta.deactivated_at = None;
        self.storage.put_tenant_meta(meta.clone()).await?;
        tracing::info!(tenant_id = %self.tenant_id, "tenant reactivated");
        Ok(meta)
    }

    /// Hands a newly committed event to both dispatchers in the
    /// background, outside the write lock's critical section (§5).
    fn fan_out(&self, event: Event, context: String) {
        let storage = self.storage.clone();
        let subscriptions = self.subscriptions.clone();
        let sub_event = event.clone();
        tokio::spawn(async move {
            match storage.list_subscriptions(true).await {
                Ok(subs) => subscriptions.dispatch(sub_event, subs),
                Err(e) => tracing::warn!(error = %e, "failed to load subscriptions for fan-out"),
            }
        });

        let integrations = self.integrations.clone();
        tokio::spawn(async move {
            integrations.dispatch(event, context).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;
    use serde_json::json;

    fn kernel() -> TenantKernel {
        let storage = Arc::new(MemoryStorage::new("t1"));
        TenantKernel::new("t1", storage, KernelConfig::default(), HashMap::new())
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let kernel = kernel();
        kernel
            .define_noun("Contact", NounDefinition::default())
            .await
            .unwrap();
        let created = kernel
            .create("Contact", json!({"name": "Alice"}), "tenant://t1")
            .await
            .unwrap();
        let fetched = kernel.get("Contact", &created.id).await.unwrap();
        assert_eq!(fetched.payload["name"], "Alice");
        assert_eq!(fetched.version, 1);
    }

    #[tokio::test]
    async fn deactivate_then_reactivate_round_trips_status() {
        let kernel = kernel();
        let meta = kernel.deactivate().await.unwrap();
        assert_eq!(meta.status, TenantStatus::Deactivated);
        assert!(meta.deactivated_at.is_some());

        let meta = kernel.reactivate().await.unwrap();
        assert_eq!(meta.status, TenantStatus::Active);
        assert!(meta.deactivated_at.is_none());
    }

    #[tokio::test]
    async fn execute_custom_verb_through_kernel_appends_event() {
        let kernel = kernel();
        let mut def = NounDefinition::default();
        def.verbs.push("close".into());
        kernel.define_noun("Deal", def).await.unwrap();
        let entity = kernel
            .create("Deal", json!({"stage": "open"}), "tenant://t1")
            .await
            .unwrap();
        let (updated, event) = kernel
            .execute("Deal", &entity.id, "close", json!({"stage": "closed"}))
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(event.event_type, "Deal.close");
    }
}
