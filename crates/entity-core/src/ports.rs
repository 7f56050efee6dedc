//! A2 — storage port trait.
//!
//! The kernel depends only on this trait, never on a concrete database
//! crate, mirroring the core/adapter split the teacher uses for its
//! storage ports (`sem_os_core::ports` is implemented by
//! `sem_os_postgres`). Two implementations ship in this workspace: an
//! in-memory engine (`crate::memory`, used by this crate's own test
//! suite) and a PostgreSQL adapter (`entity-postgres`).

use async_trait::async_trait;

use entity_types::{
    DispatchLogEntry, Entity, Event, EventQuery, HookRegistration, IntegrationHook, ListParams,
    ListResult, NounSchema, RelationshipEdge, Result, Subscription, TenantMetadata,
};

/// One tenant's exclusive storage engine (§4.11, §5 "Storage engine:
/// exclusive to one kernel"). Every method is scoped to the tenant that
/// owns the implementing instance — there is no tenant parameter because
/// isolation is structural, not a runtime check.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    // ---- nouns (C3) ----
    async fn get_noun(&self, name: &str) -> Result<Option<NounSchema>>;
    async fn list_nouns(&self) -> Result<Vec<NounSchema>>;
    async fn put_noun(&self, schema: NounSchema) -> Result<()>;

    // ---- entities (C4) ----
    async fn get_entity(&self, entity_type: &str, id: &str) -> Result<Option<Entity>>;
    async fn list_entities(
        &self,
        entity_type: &str,
        params: &ListParams,
    ) -> Result<ListResult<Entity>>;

    /// `max(sequence)` committed so far for (entity_type, entity_id), or 0
    /// if none — the executor computes `next = max + 1` from this (§4.6).
    async fn max_sequence(&self, entity_type: &str, entity_id: &str) -> Result<u64>;

    /// Persists the entity row (insert or full replace) and appends the
    /// event in one logical commit — either both land or neither does
    /// (§4.6). `entity` carries the post-mutation state; `event.sequence`
    /// must equal `entity.version` (E4) and the caller is responsible for
    /// having computed that before calling.
    async fn commit_mutation(&self, entity: Entity, event: Event) -> Result<()>;

    // ---- events (C5) ----
    async fn get_event(&self, id: &str) -> Result<Option<Event>>;
    async fn query_events(&self, query: &EventQuery) -> Result<Vec<Event>>;
    /// All events for one entity, ordered by `sequence` ascending, no
    /// limit (§4.6 `history`).
    async fn history(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Event>>;
    /// Ordered by `(timestamp, id)` ascending, the shape the CDC stream
    /// (C10) needs (§4.10).
    async fn cdc_events(&self, since_ts_exclusive: Option<chrono::DateTime<chrono::Utc>>, since_id: Option<&str>) -> Result<Vec<Event>>;

    // ---- relationship edges (supplemented, §9) ----
    async fn link(&self, edge: RelationshipEdge) -> Result<()>;
    async fn unlink(&self, subject: &str, predicate: &str, object: &str) -> Result<()>;
    async fn forward(&self, subject: &str, predicate: &str) -> Result<Vec<RelationshipEdge>>;
    async fn reverse(&self, object: &str, predicate: &str) -> Result<Vec<RelationshipEdge>>;

    // ---- hooks (supplemented, §3/§9) ----
    async fn register_hook(&self, hook: HookRegistration) -> Result<()>;
    async fn list_hooks(&self, noun: Option<&str>, verb: Option<&str>) -> Result<Vec<HookRegistration>>;

    // ---- subscriptions (C8) ----
    async fn create_subscription(&self, sub: Subscription) -> Result<()>;
    async fn list_subscriptions(&self, active_only: bool) -> Result<Vec<Subscription>>;
    async fn get_subscription(&self, id: &str) -> Result<Option<Subscription>>;

    // ---- integration hooks (C9) ----
    async fn create_integration_hook(&self, hook: IntegrationHook) -> Result<()>;
    /// Tenant-registered hooks only — the built-in table is added by the
    /// integration dispatcher, never persisted by storage (§4.9).
    async fn list_integration_hooks(&self) -> Result<Vec<IntegrationHook>>;

    // ---- dispatch log (C9) ----
    async fn append_dispatch_log(&self, entry: DispatchLogEntry) -> Result<()>;
    async fn list_dispatch_log(&self, event_id: Option<&str>) -> Result<Vec<DispatchLogEntry>>;

    // ---- tenant metadata (§4.11) ----
    async fn get_tenant_meta(&self) -> Result<TenantMetadata>;
    async fn put_tenant_meta(&self, meta: TenantMetadata) -> Result<()>;
}
