//! Pure data structures shared by every crate in the entity engine.
//!
//! This crate carries no storage, HTTP or async-runtime logic — it is the
//! vocabulary the kernel, its storage adapters and any HTTP surface all
//! speak. Keeping it dependency-light keeps the dependency graph acyclic.

pub mod entity;
pub mod envelope;
pub mod error;
pub mod event;
pub mod hook;
pub mod integration;
pub mod noun;
pub mod relationship;
pub mod subscription;
pub mod tenant;

pub use entity::{Entity, Filter, ListParams, ListResult, Sort, SortDirection};
pub use envelope::Envelope;
pub use error::{EngineError, Result};
pub use event::{CdcQuery, DiffResult, Event, EventQuery, FieldChange};
pub use hook::{HookPhase, HookRegistration};
pub use integration::{DispatchLogEntry, DispatchStatus, IntegrationHook, IntegrationService};
pub use noun::{Conjugation, FieldDescriptor, FieldKind, FieldModifiers, NounDefinition, NounSchema, ScalarType};
pub use relationship::RelationshipEdge;
pub use subscription::{Subscription, SubscriptionMode};
pub use tenant::{TenantMetadata, TenantStatus};
