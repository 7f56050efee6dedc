//! SQLx row types for the entity-postgres adapter.
//!
//! Each row struct derives `sqlx::FromRow` and converts into the pure
//! `entity-types` type via `TryFrom`. Isolates sqlx/jsonb decoding details
//! in this crate, keeping `entity-types` free of any storage dependency.

use chrono::{DateTime, Utc};
use entity_types::{
    Conjugation, DispatchLogEntry, DispatchStatus, Entity, EngineError, Event, FieldDescriptor,
    HookPhase, HookRegistration, IntegrationHook, IntegrationService, NounSchema, RelationshipEdge,
    Subscription, SubscriptionMode, TenantMetadata, TenantStatus,
};
use std::collections::{HashMap, HashSet};

#[derive(sqlx::FromRow)]
pub struct NounRow {
    pub name: String,
    pub singular: String,
    pub plural: String,
    pub slug: String,
    pub fields: serde_json::Value,
    pub verbs: serde_json::Value,
    pub disabled_verbs: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NounRow> for NounSchema {
    type Error = EngineError;

    fn try_from(row: NounRow) -> Result<Self, Self::Error> {
        let fields: HashMap<String, FieldDescriptor> = serde_json::from_value(row.fields)
            .map_err(|e| EngineError::Internal(format!("decoding noun fields: {e}")))?;
        let verbs: HashMap<String, Conjugation> = serde_json::from_value(row.verbs)
            .map_err(|e| EngineError::Internal(format!("decoding noun verbs: {e}")))?;
        let disabled_verbs: HashSet<String> = serde_json::from_value(row.disabled_verbs)
            .map_err(|e| EngineError::Internal(format!("decoding disabled verbs: {e}")))?;
        Ok(NounSchema {
            name: row.name,
            singular: row.singular,
            plural: row.plural,
            slug: row.slug,
            fields,
            verbs,
            disabled_verbs,
            created_at: row.created_at,
        })
    }
}

pub fn noun_to_columns(
    schema: &NounSchema,
) -> Result<(serde_json::Value, serde_json::Value, serde_json::Value), EngineError> {
    let fields = serde_json::to_value(&schema.fields)
        .map_err(|e| EngineError::Internal(format!("encoding noun fields: {e}")))?;
    let verbs = serde_json::to_value(&schema.verbs)
        .map_err(|e| EngineError::Internal(format!("encoding noun verbs: {e}")))?;
    let disabled_verbs = serde_json::to_value(&schema.disabled_verbs)
        .map_err(|e| EngineError::Internal(format!("encoding disabled verbs: {e}")))?;
    Ok((fields, verbs, disabled_verbs))
}

#[derive(sqlx::FromRow)]
pub struct EntityRow {
    pub id: String,
    pub entity_type: String,
    pub payload: serde_json::Value,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub context: String,
}

impl From<EntityRow> for Entity {
    fn from(row: EntityRow) -> Self {
        Entity {
            id: row.id,
            entity_type: row.entity_type,
            payload: row.payload,
            version: row.version as u64,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
            context: row.context,
        }
    }
}

#[derive(sqlx::FromRow)]
pub struct EventRow {
    pub id: String,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub verb: String,
    pub conjugation: serde_json::Value,
    pub data: Option<serde_json::Value>,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub sequence: i64,
    pub timestamp: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = EngineError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let conjugation: Conjugation = serde_json::from_value(row.conjugation)
            .map_err(|e| EngineError::Internal(format!("decoding conjugation: {e}")))?;
        Ok(Event {
            id: row.id,
            event_type: row.event_type,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            verb: row.verb,
            conjugation,
            data: row.data,
            before: row.before,
            after: row.after,
            sequence: row.sequence as u64,
            timestamp: row.timestamp,
        })
    }
}

#[derive(sqlx::FromRow)]
pub struct RelationshipRow {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub created_at: DateTime<Utc>,
}

impl From<RelationshipRow> for RelationshipEdge {
    fn from(row: RelationshipRow) -> Self {
        RelationshipEdge {
            subject: row.subject,
            predicate: row.predicate,
            object: row.object,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub struct HookRow {
    pub noun: String,
    pub verb: String,
    pub phase: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<HookRow> for HookRegistration {
    type Error = EngineError;

    fn try_from(row: HookRow) -> Result<Self, Self::Error> {
        let phase = match row.phase.as_str() {
            "before" => HookPhase::Before,
            "after" => HookPhase::After,
            other => {
                return Err(EngineError::Internal(format!("unknown hook phase '{other}'")))
            }
        };
        Ok(HookRegistration {
            noun: row.noun,
            verb: row.verb,
            phase,
            code: row.code,
            created_at: row.created_at,
        })
    }
}

pub fn hook_phase_str(phase: HookPhase) -> &'static str {
    match phase {
        HookPhase::Before => "before",
        HookPhase::After => "after",
    }
}

#[derive(sqlx::FromRow)]
pub struct SubscriptionRow {
    pub id: String,
    pub pattern: String,
    pub mode: String,
    pub endpoint: String,
    pub secret: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = EngineError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let mode = match row.mode.as_str() {
            "webhook" => SubscriptionMode::Webhook,
            "websocket" => SubscriptionMode::Websocket,
            other => {
                return Err(EngineError::Internal(format!("unknown subscription mode '{other}'")))
            }
        };
        Ok(Subscription {
            id: row.id,
            pattern: row.pattern,
            mode,
            endpoint: row.endpoint,
            secret: row.secret,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

pub fn subscription_mode_str(mode: SubscriptionMode) -> &'static str {
    match mode {
        SubscriptionMode::Webhook => "webhook",
        SubscriptionMode::Websocket => "websocket",
    }
}

#[derive(sqlx::FromRow)]
pub struct IntegrationHookRow {
    pub id: String,
    pub entity_type: String,
    pub verb: String,
    pub service: String,
    pub method: String,
    pub config: Option<serde_json::Value>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<IntegrationHookRow> for IntegrationHook {
    type Error = EngineError;

    fn try_from(row: IntegrationHookRow) -> Result<Self, Self::Error> {
        let service = match row.service.as_str() {
            "PAYMENTS" => IntegrationService::Payments,
            "REPO" => IntegrationService::Repo,
            "INTEGRATIONS" => IntegrationService::Integrations,
            "OAUTH" => IntegrationService::Oauth,
            "EVENTS" => IntegrationService::Events,
            other => {
                return Err(EngineError::Internal(format!("unknown integration service '{other}'")))
            }
        };
        Ok(IntegrationHook {
            id: row.id,
            entity_type: row.entity_type,
            verb: row.verb,
            service,
            method: row.method,
            config: row.config,
            active: row.active,
            created_at: row.created_at,
            builtin: false,
        })
    }
}

#[derive(sqlx::FromRow)]
pub struct DispatchLogRow {
    pub id: String,
    pub event_id: String,
    pub hook_id: String,
    pub service: String,
    pub method: String,
    pub status: String,
    pub status_code: Option<i32>,
    pub error: Option<String>,
    pub duration_ms: i64,
    pub timestamp: DateTime<Utc>,
}

impl TryFrom<DispatchLogRow> for DispatchLogEntry {
    type Error = EngineError;

    fn try_from(row: DispatchLogRow) -> Result<Self, Self::Error> {
        let status = match row.status.as_str() {
            "success" => DispatchStatus::Success,
            "error" => DispatchStatus::Error,
            other => {
                return Err(EngineError::Internal(format!("unknown dispatch status '{other}'")))
            }
        };
        Ok(DispatchLogEntry {
            id: row.id,
            event_id: row.event_id,
            hook_id: row.hook_id,
            service: row.service,
            method: row.method,
            status,
            status_code: row.status_code.map(|c| c as u16),
            error: row.error,
            duration_ms: row.duration_ms as u64,
            timestamp: row.timestamp,
        })
    }
}

pub fn dispatch_status_str(status: DispatchStatus) -> &'static str {
    match status {
        DispatchStatus::Success => "success",
        DispatchStatus::Error => "error",
    }
}

#[derive(sqlx::FromRow)]
pub struct TenantMetaRow {
    pub tenant_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub name: Option<String>,
    pub plan: Option<String>,
    pub deactivated_at: Option<DateTime<Utc>>,
}

impl TryFrom<TenantMetaRow> for TenantMetadata {
    type Error = EngineError;

    fn try_from(row: TenantMetaRow) -> Result<Self, Self::Error> {
        let status = match row.status.as_str() {
            "active" => TenantStatus::Active,
            "deactivated" => TenantStatus::Deactivated,
            other => {
                return Err(EngineError::Internal(format!("unknown tenant status '{other}'")))
            }
        };
        Ok(TenantMetadata {
            tenant_id: row.tenant_id,
            status,
            created_at: row.created_at,
            name: row.name,
            plan: row.plan,
            deactivated_at: row.deactivated_at,
        })
    }
}

pub fn tenant_status_str(status: TenantStatus) -> &'static str {
    match status {
        TenantStatus::Active => "active",
        TenantStatus::Deactivated => "deactivated",
    }
}
