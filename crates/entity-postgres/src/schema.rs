//! Schema-per-tenant provisioning.
//!
//! Each tenant gets its own Postgres schema holding the full table set
//! (nouns/entities/events/relationships/hooks/subscriptions/
//! integration_hooks/dispatch_log/tenant_meta). Isolation between tenants
//! is therefore structural (separate schemas), matching the kernel's
//! "storage engine exclusive to one kernel" model (§4.11/§5) rather than
//! a shared-table `tenant_id` column.

use entity_types::{EngineError, Result};
use sqlx::PgPool;

/// Postgres identifiers must be quoted and the tenant id must not be
/// allowed to break out of that quoting. Tenant ids are minted internally
/// as `[a-zA-Z0-9_]+` (see `entity-core::ids`), but this sanitizes
/// defensively for tenant ids sourced elsewhere.
pub fn schema_name(tenant_id: &str) -> String {
    let cleaned: String = tenant_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("tenant_{cleaned}")
}

/// Creates the tenant's schema and its full table set if they do not
/// already exist. Safe to call on every kernel startup.
pub async fn ensure_schema(pool: &PgPool, schema: &str) -> Result<()> {
    let ddl = format!(
        r#"
        CREATE SCHEMA IF NOT EXISTS "{schema}";

        CREATE TABLE IF NOT EXISTS "{schema}".nouns (
            name            text PRIMARY KEY,
            singular        text NOT NULL,
            plural          text NOT NULL,
            slug            text NOT NULL,
            fields          jsonb NOT NULL,
            verbs           jsonb NOT NULL,
            disabled_verbs  jsonb NOT NULL,
            created_at      timestamptz NOT NULL
        );

        CREATE TABLE IF NOT EXISTS "{schema}".entities (
            entity_type  text NOT NULL,
            id           text NOT NULL,
            payload      jsonb NOT NULL,
            version      bigint NOT NULL,
            created_at   timestamptz NOT NULL,
            updated_at   timestamptz NOT NULL,
            deleted_at   timestamptz,
            context      text NOT NULL,
            PRIMARY KEY (entity_type, id)
        );
        CREATE INDEX IF NOT EXISTS entities_type_idx
            ON "{schema}".entities (entity_type);
        CREATE INDEX IF NOT EXISTS entities_type_deleted_idx
            ON "{schema}".entities (entity_type, deleted_at);

        CREATE TABLE IF NOT EXISTS "{schema}".events (
            id           text PRIMARY KEY,
            event_type   text NOT NULL,
            entity_type  text NOT NULL,
            entity_id    text NOT NULL,
            verb         text NOT NULL,
            conjugation  jsonb NOT NULL,
            data         jsonb,
            before       jsonb,
            after        jsonb,
            sequence     bigint NOT NULL,
            timestamp    timestamptz NOT NULL
        );
        CREATE INDEX IF NOT EXISTS events_entity_sequence_idx
            ON "{schema}".events (entity_type, entity_id, sequence);
        CREATE INDEX IF NOT EXISTS events_timestamp_id_idx
            ON "{schema}".events (timestamp, id);
        CREATE INDEX IF NOT EXISTS events_verb_idx
            ON "{schema}".events (verb);

        CREATE TABLE IF NOT EXISTS "{schema}".relationships (
            subject     text NOT NULL,
            predicate   text NOT NULL,
            object      text NOT NULL,
            created_at  timestamptz NOT NULL,
            PRIMARY KEY (subject, predicate, object)
        );
        CREATE INDEX IF NOT EXISTS relationships_reverse_idx
            ON "{schema}".relationships (object, predicate);

        CREATE TABLE IF NOT EXISTS "{schema}".hooks (
            noun        text NOT NULL,
            verb        text NOT NULL,
            phase       text NOT NULL,
            code        text NOT NULL,
            created_at  timestamptz NOT NULL,
            PRIMARY KEY (noun, verb, phase)
        );

        CREATE TABLE IF NOT EXISTS "{schema}".subscriptions (
            id          text PRIMARY KEY,
            pattern     text NOT NULL,
            mode        text NOT NULL,
            endpoint    text NOT NULL,
            secret      text,
            active      boolean NOT NULL,
            created_at  timestamptz NOT NULL
        );
        CREATE INDEX IF NOT EXISTS subscriptions_pattern_idx
            ON "{schema}".subscriptions (pattern);
        CREATE INDEX IF NOT EXISTS subscriptions_active_idx
            ON "{schema}".subscriptions (active);

        CREATE TABLE IF NOT EXISTS "{schema}".integration_hooks (
            id           text PRIMARY KEY,
            entity_type  text NOT NULL,
            verb         text NOT NULL,
            service      text NOT NULL,
            method       text NOT NULL,
            config       jsonb,
            active       boolean NOT NULL,
            created_at   timestamptz NOT NULL
        );
        CREATE INDEX IF NOT EXISTS integration_hooks_match_idx
            ON "{schema}".integration_hooks (entity_type, verb, active);

        CREATE TABLE IF NOT EXISTS "{schema}".dispatch_log (
            id           text PRIMARY KEY,
            event_id     text NOT NULL,
            hook_id      text NOT NULL,
            service      text NOT NULL,
            method       text NOT NULL,
            status       text NOT NULL,
            status_code  int,
            error        text,
            duration_ms  bigint NOT NULL,
            timestamp    timestamptz NOT NULL
        );
        CREATE INDEX IF NOT EXISTS dispatch_log_event_idx
            ON "{schema}".dispatch_log (event_id);
        CREATE INDEX IF NOT EXISTS dispatch_log_timestamp_idx
            ON "{schema}".dispatch_log (timestamp);

        CREATE TABLE IF NOT EXISTS "{schema}".tenant_meta (
            tenant_id        text PRIMARY KEY,
            status           text NOT NULL,
            created_at       timestamptz NOT NULL,
            name             text,
            plan             text,
            deactivated_at   timestamptz
        );
        "#
    );

    sqlx::raw_sql(&ddl)
        .execute(pool)
        .await
        .map_err(|e| EngineError::Internal(e.to_string()))?;
    Ok(())
}
