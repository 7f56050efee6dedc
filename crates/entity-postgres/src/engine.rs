//! The `StorageEngine` implementation itself — one `PgStorageEngine` per
//! tenant kernel, each scoped to its own Postgres schema (§4.11 "Storage
//! engine: exclusive to one kernel").

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entity_core::ports::StorageEngine;
use entity_types::{
    DispatchLogEntry, Entity, EngineError, Event, EventQuery, HookRegistration, IntegrationHook,
    ListParams, ListResult, NounSchema, RelationshipEdge, Result, Subscription, TenantMetadata,
    TenantStatus,
};
use sqlx::{PgPool, QueryBuilder, Row};

use crate::rows::{
    dispatch_status_str, hook_phase_str, noun_to_columns, subscription_mode_str,
    tenant_status_str, DispatchLogRow, EntityRow, EventRow, HookRow, IntegrationHookRow, NounRow,
    RelationshipRow, SubscriptionRow, TenantMetaRow,
};
use crate::schema::{ensure_schema, schema_name};

fn internal(e: sqlx::Error) -> EngineError {
    EngineError::Internal(e.to_string())
}

/// Fields the entity store itself owns as real columns rather than keys
/// inside `payload` (§3, §4.4). `list_entities`'s filter/sort pushdown
/// has to branch on this set the same way `document::field_value` does
/// for the in-memory engine.
fn is_meta_field(field: &str) -> bool {
    matches!(
        field,
        "id" | "type" | "version" | "createdAt" | "$createdAt" | "updatedAt" | "$updatedAt" | "context"
    )
}

pub struct PgStorageEngine {
    pool: PgPool,
    schema: String,
}

impl PgStorageEngine {
    /// Constructs an engine for an already-provisioned tenant schema.
    pub fn new(pool: PgPool, tenant_id: &str) -> Self {
        Self {
            pool,
            schema: schema_name(tenant_id),
        }
    }

    /// Provisions the tenant's schema (idempotent) and returns an engine
    /// bound to it — the path a tenant kernel takes on first access
    /// (§4.11 "created lazily on first access to a tenant id").
    pub async fn connect(pool: PgPool, tenant_id: &str) -> Result<Self> {
        let schema = schema_name(tenant_id);
        ensure_schema(&pool, &schema).await?;
        let engine = Self { pool, schema };
        engine.ensure_tenant_meta(tenant_id).await?;
        Ok(engine)
    }

    async fn ensure_tenant_meta(&self, tenant_id: &str) -> Result<()> {
        let sql = format!(
            r#"INSERT INTO "{}".tenant_meta (tenant_id, status, created_at, name, plan, deactivated_at)
               VALUES ($1, 'active', now(), NULL, NULL, NULL)
               ON CONFLICT (tenant_id) DO NOTHING"#,
            self.schema
        );
        sqlx::query(&sql)
            .bind(tenant_id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    fn t(&self, table: &str) -> String {
        format!("\"{}\".{table}", self.schema)
    }
}

#[async_trait]
impl StorageEngine for PgStorageEngine {
    // ---- nouns (C3) ----

    async fn get_noun(&self, name: &str) -> Result<Option<NounSchema>> {
        let sql = format!(
            "SELECT name, singular, plural, slug, fields, verbs, disabled_verbs, created_at FROM {} WHERE name = $1",
            self.t("nouns")
        );
        let row = sqlx::query_as::<_, NounRow>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        row.map(NounSchema::try_from).transpose()
    }

    async fn list_nouns(&self) -> Result<Vec<NounSchema>> {
        let sql = format!(
            "SELECT name, singular, plural, slug, fields, verbs, disabled_verbs, created_at FROM {} ORDER BY name",
            self.t("nouns")
        );
        let rows = sqlx::query_as::<_, NounRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        rows.into_iter().map(NounSchema::try_from).collect()
    }

    async fn put_noun(&self, schema: NounSchema) -> Result<()> {
        let (fields, verbs, disabled_verbs) = noun_to_columns(&schema)?;
        let sql = format!(
            r#"INSERT INTO {} (name, singular, plural, slug, fields, verbs, disabled_verbs, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               ON CONFLICT (name) DO UPDATE SET
                 singular = EXCLUDED.singular,
                 plural = EXCLUDED.plural,
                 slug = EXCLUDED.slug,
                 fields = EXCLUDED.fields,
                 verbs = EXCLUDED.verbs,
                 disabled_verbs = EXCLUDED.disabled_verbs"#,
            self.t("nouns")
        );
        sqlx::query(&sql)
            .bind(&schema.name)
            .bind(&schema.singular)
            .bind(&schema.plural)
            .bind(&schema.slug)
            .bind(fields)
            .bind(verbs)
            .bind(disabled_verbs)
            .bind(schema.created_at)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    // ---- entities (C4) ----

    async fn get_entity(&self, entity_type: &str, id: &str) -> Result<Option<Entity>> {
        let sql = format!(
            r#"SELECT id, entity_type, payload, version, created_at, updated_at, deleted_at, context
               FROM {} WHERE entity_type = $1 AND id = $2 AND deleted_at IS NULL"#,
            self.t("entities")
        );
        let row = sqlx::query_as::<_, EntityRow>(&sql)
            .bind(entity_type)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        Ok(row.map(Entity::from))
    }

    /// Pushes the flat equality filter down into the WHERE clause (§4.4
    /// "Filter must be pushed down into the storage query") rather than
    /// fetching everything and filtering in Rust — `total`/`hasMore` are
    /// computed from the same filtered query, never the unfiltered table
    /// (I-Filter).
    async fn list_entities(
        &self,
        entity_type: &str,
        params: &ListParams,
    ) -> Result<ListResult<Entity>> {
        let table = self.t("entities");

        let mut count_qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT count(*) FROM {table} WHERE entity_type = "
        ));
        count_qb.push_bind(entity_type);
        count_qb.push(" AND deleted_at IS NULL");
        push_filter(&mut count_qb, params);
        let total: i64 = count_qb
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(internal)?
            .try_get(0)
            .map_err(internal)?;

        let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT id, entity_type, payload, version, created_at, updated_at, deleted_at, context FROM {table} WHERE entity_type = "
        ));
        qb.push_bind(entity_type);
        qb.push(" AND deleted_at IS NULL");
        push_filter(&mut qb, params);
        push_sort(&mut qb, params);
        qb.push(" LIMIT ");
        qb.push_bind(params.limit as i64);
        qb.push(" OFFSET ");
        qb.push_bind(params.offset as i64);

        let rows = qb
            .build_query_as::<EntityRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        let items: Vec<Entity> = rows.into_iter().map(Entity::from).collect();

        let total = total as u64;
        let has_more = (params.offset as u64 + items.len() as u64) < total;
        Ok(ListResult {
            items,
            total,
            limit: params.limit,
            offset: params.offset,
            has_more,
        })
    }

    async fn max_sequence(&self, entity_type: &str, entity_id: &str) -> Result<u64> {
        let sql = format!(
            "SELECT COALESCE(max(sequence), 0) FROM {} WHERE entity_type = $1 AND entity_id = $2",
            self.t("events")
        );
        let max: i64 = sqlx::query(&sql)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_one(&self.pool)
            .await
            .map_err(internal)?
            .try_get(0)
            .map_err(internal)?;
        Ok(max as u64)
    }

    /// Persists the entity row and appends its event inside one
    /// transaction — either both land or neither does (§4.6).
    async fn commit_mutation(&self, entity: Entity, event: Event) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(internal)?;

        let entity_sql = format!(
            r#"INSERT INTO {} (entity_type, id, payload, version, created_at, updated_at, deleted_at, context)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               ON CONFLICT (entity_type, id) DO UPDATE SET
                 payload = EXCLUDED.payload,
                 version = EXCLUDED.version,
                 updated_at = EXCLUDED.updated_at,
                 deleted_at = EXCLUDED.deleted_at"#,
            self.t("entities")
        );
        sqlx::query(&entity_sql)
            .bind(&entity.entity_type)
            .bind(&entity.id)
            .bind(&entity.payload)
            .bind(entity.version as i64)
            .bind(entity.created_at)
            .bind(entity.updated_at)
            .bind(entity.deleted_at)
            .bind(&entity.context)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;

        let conjugation = serde_json::to_value(&event.conjugation).map_err(|e| {
            EngineError::Internal(format!("encoding event conjugation: {e}"))
        })?;
        let event_sql = format!(
            r#"INSERT INTO {} (id, event_type, entity_type, entity_id, verb, conjugation, data, before, after, sequence, timestamp)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
            self.t("events")
        );
        sqlx::query(&event_sql)
            .bind(&event.id)
            .bind(&event.event_type)
            .bind(&event.entity_type)
            .bind(&event.entity_id)
            .bind(&event.verb)
            .bind(conjugation)
            .bind(&event.data)
            .bind(&event.before)
            .bind(&event.after)
            .bind(event.sequence as i64)
            .bind(event.timestamp)
            .execute(&mut *tx)
            .await
            .map_err(internal)?;

        tx.commit().await.map_err(internal)?;
        Ok(())
    }

    // ---- events (C5) ----

    async fn get_event(&self, id: &str) -> Result<Option<Event>> {
        let sql = format!(
            r#"SELECT id, event_type, entity_type, entity_id, verb, conjugation, data, before, after, sequence, timestamp
               FROM {} WHERE id = $1"#,
            self.t("events")
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        row.map(Event::try_from).transpose()
    }

    async fn query_events(&self, query: &EventQuery) -> Result<Vec<Event>> {
        let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            r#"SELECT id, event_type, entity_type, entity_id, verb, conjugation, data, before, after, sequence, timestamp
               FROM {} WHERE 1 = 1"#,
            self.t("events")
        ));
        if let Some(since) = query.since {
            qb.push(" AND timestamp >= ");
            qb.push_bind(since);
        }
        if let Some(event_type) = &query.event_type {
            qb.push(" AND event_type = ");
            qb.push_bind(event_type.clone());
        }
        if let Some(entity_id) = &query.entity_id {
            qb.push(" AND entity_id = ");
            qb.push_bind(entity_id.clone());
        }
        if let Some(verb) = &query.verb {
            qb.push(" AND verb = ");
            qb.push_bind(verb.clone());
        }
        qb.push(" ORDER BY timestamp DESC LIMIT ");
        qb.push_bind(query.limit.clamp(1, 1000) as i64);

        let rows = qb
            .build_query_as::<EventRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        rows.into_iter().map(Event::try_from).collect()
    }

    async fn history(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Event>> {
        let sql = format!(
            r#"SELECT id, event_type, entity_type, entity_id, verb, conjugation, data, before, after, sequence, timestamp
               FROM {} WHERE entity_type = $1 AND entity_id = $2 ORDER BY sequence ASC"#,
            self.t("events")
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        rows.into_iter().map(Event::try_from).collect()
    }

    async fn cdc_events(
        &self,
        since_ts_exclusive: Option<DateTime<Utc>>,
        since_id: Option<&str>,
    ) -> Result<Vec<Event>> {
        let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            r#"SELECT id, event_type, entity_type, entity_id, verb, conjugation, data, before, after, sequence, timestamp
               FROM {} WHERE 1 = 1"#,
            self.t("events")
        ));
        if let Some(ts) = since_ts_exclusive {
            qb.push(" AND (timestamp > ");
            qb.push_bind(ts);
            if let Some(id) = since_id {
                qb.push(" OR (timestamp = ");
                qb.push_bind(ts);
                qb.push(" AND id > ");
                qb.push_bind(id.to_string());
                qb.push(")");
            }
            qb.push(")");
        }
        qb.push(" ORDER BY timestamp ASC, id ASC");

        let rows = qb
            .build_query_as::<EventRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        rows.into_iter().map(Event::try_from).collect()
    }

    // ---- relationship edges (supplemented, §9) ----

    async fn link(&self, edge: RelationshipEdge) -> Result<()> {
        let sql = format!(
            r#"INSERT INTO {} (subject, predicate, object, created_at)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (subject, predicate, object) DO NOTHING"#,
            self.t("relationships")
        );
        sqlx::query(&sql)
            .bind(&edge.subject)
            .bind(&edge.predicate)
            .bind(&edge.object)
            .bind(edge.created_at)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn unlink(&self, subject: &str, predicate: &str, object: &str) -> Result<()> {
        let sql = format!(
            "DELETE FROM {} WHERE subject = $1 AND predicate = $2 AND object = $3",
            self.t("relationships")
        );
        sqlx::query(&sql)
            .bind(subject)
            .bind(predicate)
            .bind(object)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn forward(&self, subject: &str, predicate: &str) -> Result<Vec<RelationshipEdge>> {
        let sql = format!(
            "SELECT subject, predicate, object, created_at FROM {} WHERE subject = $1 AND predicate = $2",
            self.t("relationships")
        );
        let rows = sqlx::query_as::<_, RelationshipRow>(&sql)
            .bind(subject)
            .bind(predicate)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        Ok(rows.into_iter().map(RelationshipEdge::from).collect())
    }

    async fn reverse(&self, object: &str, predicate: &str) -> Result<Vec<RelationshipEdge>> {
        let sql = format!(
            "SELECT subject, predicate, object, created_at FROM {} WHERE object = $1 AND predicate = $2",
            self.t("relationships")
        );
        let rows = sqlx::query_as::<_, RelationshipRow>(&sql)
            .bind(object)
            .bind(predicate)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        Ok(rows.into_iter().map(RelationshipEdge::from).collect())
    }

    // ---- hooks (supplemented, §3/§9) ----

    async fn register_hook(&self, hook: HookRegistration) -> Result<()> {
        let sql = format!(
            r#"INSERT INTO {} (noun, verb, phase, code, created_at)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (noun, verb, phase) DO UPDATE SET code = EXCLUDED.code, created_at = EXCLUDED.created_at"#,
            self.t("hooks")
        );
        sqlx::query(&sql)
            .bind(&hook.noun)
            .bind(&hook.verb)
            .bind(hook_phase_str(hook.phase))
            .bind(&hook.code)
            .bind(hook.created_at)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn list_hooks(&self, noun: Option<&str>, verb: Option<&str>) -> Result<Vec<HookRegistration>> {
        let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT noun, verb, phase, code, created_at FROM {} WHERE 1 = 1",
            self.t("hooks")
        ));
        if let Some(noun) = noun {
            qb.push(" AND noun = ");
            qb.push_bind(noun.to_string());
        }
        if let Some(verb) = verb {
            qb.push(" AND verb = ");
            qb.push_bind(verb.to_string());
        }
        let rows = qb
            .build_query_as::<HookRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        rows.into_iter().map(HookRegistration::try_from).collect()
    }

    // ---- subscriptions (C8) ----

    async fn create_subscription(&self, sub: Subscription) -> Result<()> {
        let sql = format!(
            r#"INSERT INTO {} (id, pattern, mode, endpoint, secret, active, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
            self.t("subscriptions")
        );
        sqlx::query(&sql)
            .bind(&sub.id)
            .bind(&sub.pattern)
            .bind(subscription_mode_str(sub.mode))
            .bind(&sub.endpoint)
            .bind(&sub.secret)
            .bind(sub.active)
            .bind(sub.created_at)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn list_subscriptions(&self, active_only: bool) -> Result<Vec<Subscription>> {
        let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT id, pattern, mode, endpoint, secret, active, created_at FROM {} WHERE 1 = 1",
            self.t("subscriptions")
        ));
        if active_only {
            qb.push(" AND active = true");
        }
        let rows = qb
            .build_query_as::<SubscriptionRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn get_subscription(&self, id: &str) -> Result<Option<Subscription>> {
        let sql = format!(
            "SELECT id, pattern, mode, endpoint, secret, active, created_at FROM {} WHERE id = $1",
            self.t("subscriptions")
        );
        let row = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        row.map(Subscription::try_from).transpose()
    }

    // ---- integration hooks (C9) ----

    async fn create_integration_hook(&self, hook: IntegrationHook) -> Result<()> {
        let sql = format!(
            r#"INSERT INTO {} (id, entity_type, verb, service, method, config, active, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
            self.t("integration_hooks")
        );
        sqlx::query(&sql)
            .bind(&hook.id)
            .bind(&hook.entity_type)
            .bind(&hook.verb)
            .bind(hook.service.as_str())
            .bind(&hook.method)
            .bind(&hook.config)
            .bind(hook.active)
            .bind(hook.created_at)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn list_integration_hooks(&self) -> Result<Vec<IntegrationHook>> {
        let sql = format!(
            "SELECT id, entity_type, verb, service, method, config, active, created_at FROM {}",
            self.t("integration_hooks")
        );
        let rows = sqlx::query_as::<_, IntegrationHookRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        rows.into_iter().map(IntegrationHook::try_from).collect()
    }

    // ---- dispatch log (C9) ----

    async fn append_dispatch_log(&self, entry: DispatchLogEntry) -> Result<()> {
        let sql = format!(
            r#"INSERT INTO {} (id, event_id, hook_id, service, method, status, status_code, error, duration_ms, timestamp)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
            self.t("dispatch_log")
        );
        sqlx::query(&sql)
            .bind(&entry.id)
            .bind(&entry.event_id)
            .bind(&entry.hook_id)
            .bind(&entry.service)
            .bind(&entry.method)
            .bind(dispatch_status_str(entry.status))
            .bind(entry.status_code.map(|c| c as i32))
            .bind(&entry.error)
            .bind(entry.duration_ms as i64)
            .bind(entry.timestamp)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn list_dispatch_log(&self, event_id: Option<&str>) -> Result<Vec<DispatchLogEntry>> {
        let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT id, event_id, hook_id, service, method, status, status_code, error, duration_ms, timestamp FROM {} WHERE 1 = 1",
            self.t("dispatch_log")
        ));
        if let Some(event_id) = event_id {
            qb.push(" AND event_id = ");
            qb.push_bind(event_id.to_string());
        }
        qb.push(" ORDER BY timestamp DESC");
        let rows = qb
            .build_query_as::<DispatchLogRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(internal)?;
        rows.into_iter().map(DispatchLogEntry::try_from).collect()
    }

    // ---- tenant metadata (§4.11) ----

    async fn get_tenant_meta(&self) -> Result<TenantMetadata> {
        let sql = format!(
            "SELECT tenant_id, status, created_at, name, plan, deactivated_at FROM {} LIMIT 1",
            self.t("tenant_meta")
        );
        let row = sqlx::query_as::<_, TenantMetaRow>(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;
        match row {
            Some(row) => TenantMetadata::try_from(row),
            None => Err(EngineError::Internal(
                "tenant_meta row missing — call PgStorageEngine::connect first".into(),
            )),
        }
    }

    async fn put_tenant_meta(&self, meta: TenantMetadata) -> Result<()> {
        let sql = format!(
            r#"INSERT INTO {} (tenant_id, status, created_at, name, plan, deactivated_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (tenant_id) DO UPDATE SET
                 status = EXCLUDED.status,
                 name = EXCLUDED.name,
                 plan = EXCLUDED.plan,
                 deactivated_at = EXCLUDED.deactivated_at"#,
            self.t("tenant_meta")
        );
        sqlx::query(&sql)
            .bind(&meta.tenant_id)
            .bind(tenant_status_str(meta.status))
            .bind(meta.created_at)
            .bind(&meta.name)
            .bind(&meta.plan)
            .bind(meta.deactivated_at)
            .execute(&self.pool)
            .await
            .map_err(internal)?;
        Ok(())
    }
}

/// Filter values on `createdAt`/`updatedAt` arrive as ISO-8601 strings
/// (the caller-facing representation everywhere else in this crate);
/// anything else degrades to `now()` rather than failing the whole query,
/// since filter value parsing errors belong to the HTTP edge (out of
/// scope here), not the storage port.
fn parse_filter_timestamp(value: &serde_json::Value) -> DateTime<Utc> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// Appends the filter's AND-combined equality predicates (§4.4). Meta
/// fields compare against their real column; everything else compares
/// against the payload document via jsonb containment, with a `null`
/// filter value matching both an explicit JSON null and a wholly absent
/// key (mirrors `document::matches_filter`'s in-memory semantics).
fn push_filter(qb: &mut QueryBuilder<sqlx::Postgres>, params: &ListParams) {
    for (field, value) in params.filter.iter() {
        if is_meta_field(field) {
            match field.as_str() {
                "id" => {
                    qb.push(" AND id = ");
                    qb.push_bind(value.as_str().unwrap_or_default().to_string());
                }
                "type" => {
                    qb.push(" AND entity_type = ");
                    qb.push_bind(value.as_str().unwrap_or_default().to_string());
                }
                "context" => {
                    qb.push(" AND context = ");
                    qb.push_bind(value.as_str().unwrap_or_default().to_string());
                }
                "version" => {
                    qb.push(" AND version = ");
                    qb.push_bind(value.as_u64().unwrap_or_default() as i64);
                }
                "createdAt" | "$createdAt" => {
                    qb.push(" AND created_at = ");
                    qb.push_bind(parse_filter_timestamp(value));
                }
                "updatedAt" | "$updatedAt" => {
                    qb.push(" AND updated_at = ");
                    qb.push_bind(parse_filter_timestamp(value));
                }
                _ => unreachable!("is_meta_field covers only the arms above"),
            }
        } else if value.is_null() {
            qb.push(" AND (payload -> ");
            qb.push_bind(field.clone());
            qb.push(" IS NULL OR payload -> ");
            qb.push_bind(field.clone());
            qb.push(" = 'null'::jsonb)");
        } else {
            let containment = serde_json::json!({ field: value });
            qb.push(" AND payload @> ");
            qb.push_bind(containment);
            qb.push("::jsonb");
        }
    }
}

fn push_sort(qb: &mut QueryBuilder<sqlx::Postgres>, params: &ListParams) {
    let sort = params.sort.clone().unwrap_or_default();
    let direction = match sort.direction {
        entity_types::SortDirection::Asc => "ASC",
        entity_types::SortDirection::Desc => "DESC",
    };
    match sort.field.as_str() {
        "createdAt" | "$createdAt" => qb.push(format!(" ORDER BY created_at {direction}")),
        "updatedAt" | "$updatedAt" => qb.push(format!(" ORDER BY updated_at {direction}")),
        "type" => qb.push(format!(" ORDER BY entity_type {direction}")),
        field if is_meta_field(field) => qb.push(format!(" ORDER BY {field} {direction}")),
        field => {
            qb.push(" ORDER BY payload ->> ");
            qb.push_bind(field.to_string());
            qb.push(format!(" {direction}"))
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity_types::{Filter, Sort, SortDirection};
    use serde_json::json;

    // Integration tests against a real Postgres instance. Each test gets
    // a fresh ephemeral database; `PgStorageEngine::connect` provisions
    // the tenant schema into it.

    #[sqlx::test]
    async fn put_and_get_noun_round_trips(pool: PgPool) -> anyhow::Result<()> {
        let engine = PgStorageEngine::connect(pool, "t1").await?;
        let schema = NounSchema {
            name: "Contact".into(),
            singular: "Contact".into(),
            plural: "Contacts".into(),
            slug: "contact".into(),
            fields: Default::default(),
            verbs: Default::default(),
            disabled_verbs: Default::default(),
            created_at: Utc::now(),
        };
        engine.put_noun(schema).await?;
        let fetched = engine.get_noun("Contact").await?;
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().plural, "Contacts");
        Ok(())
    }

    #[sqlx::test]
    async fn commit_mutation_persists_entity_and_event_together(pool: PgPool) -> anyhow::Result<()> {
        let engine = PgStorageEngine::connect(pool, "t1").await?;
        let now = Utc::now();
        let entity = Entity {
            id: "contact_abc1234567".into(),
            entity_type: "Contact".into(),
            payload: json!({"name": "Alice", "stage": "Lead"}),
            version: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            context: "tenant://t1".into(),
        };
        let event = Event {
            id: "evt_abc123456789".into(),
            event_type: "Contact.create".into(),
            entity_type: "Contact".into(),
            entity_id: entity.id.clone(),
            verb: "create".into(),
            conjugation: entity_types::Conjugation::new("create", "creating", "created"),
            data: Some(entity.payload.clone()),
            before: None,
            after: Some(entity.to_document()),
            sequence: 1,
            timestamp: now,
        };

        engine.commit_mutation(entity.clone(), event.clone()).await?;

        let fetched = engine.get_entity("Contact", &entity.id).await?.unwrap();
        assert_eq!(fetched.payload["name"], "Alice");
        assert_eq!(fetched.version, 1);

        let history = engine.history("Contact", &entity.id).await?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].sequence, 1);

        let max_seq = engine.max_sequence("Contact", &entity.id).await?;
        assert_eq!(max_seq, 1);
        Ok(())
    }

    #[sqlx::test]
    async fn list_entities_pushes_filter_into_the_query(pool: PgPool) -> anyhow::Result<()> {
        let engine = PgStorageEngine::connect(pool, "t1").await?;
        for (i, stage) in ["Customer", "Customer", "Lead"].iter().enumerate() {
            let now = Utc::now();
            let entity = Entity {
                id: format!("contact_{i:010}"),
                entity_type: "Contact".into(),
                payload: json!({"stage": stage}),
                version: 1,
                created_at: now,
                updated_at: now,
                deleted_at: None,
                context: "t".into(),
            };
            let event = Event {
                id: format!("evt_{i:012}"),
                event_type: "Contact.create".into(),
                entity_type: "Contact".into(),
                entity_id: entity.id.clone(),
                verb: "create".into(),
                conjugation: entity_types::Conjugation::new("create", "creating", "created"),
                data: None,
                before: None,
                after: Some(entity.to_document()),
                sequence: 1,
                timestamp: now,
            };
            engine.commit_mutation(entity, event).await?;
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
        let result = engine.list_entities("Contact", &params).await?;
        assert_eq!(result.total, 1);
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].payload["stage"], "Lead");
        assert!(!result.has_more);
        Ok(())
    }

    #[sqlx::test]
    async fn deactivate_and_reactivate_round_trips_tenant_meta(pool: PgPool) -> anyhow::Result<()> {
        let engine = PgStorageEngine::connect(pool, "t1").await?;
        let mut meta = engine.get_tenant_meta().await?;
        assert_eq!(meta.status, TenantStatus::Active);

        meta.status = TenantStatus::Deactivated;
        meta.deactivated_at = Some(Utc::now());
        engine.put_tenant_meta(meta).await?;

        let reloaded = engine.get_tenant_meta().await?;
        assert_eq!(reloaded.status, TenantStatus::Deactivated);
        assert!(reloaded.deactivated_at.is_some());
        Ok(())
    }
}
