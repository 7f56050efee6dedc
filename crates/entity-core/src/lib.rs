//! Per-tenant entity/event kernel.
//!
//! This crate depends only on `entity-types` and the [`ports::StorageEngine`]
//! port — no concrete database crate. [`tenant_kernel::TenantKernel`] is the
//! single entry point embedders construct; everything else is an internal
//! collaborator it owns.

pub mod cdc;
pub mod config;
pub mod conjugator;
pub mod document;
pub mod entity_store;
pub mod ids;
pub mod integration_dispatcher;
pub mod memory;
pub mod ports;
pub mod relationships;
pub mod schema_registry;
pub mod subscription_dispatcher;
pub mod tenant_kernel;
pub mod time_travel;
pub mod verb_executor;

pub use cdc::CdcStream;
pub use config::KernelConfig;
pub use entity_store::EntityStore;
pub use integration_dispatcher::{HttpServiceBinding, IntegrationDispatcher, ServiceBinding};
pub use memory::MemoryStorage;
pub use ports::StorageEngine;
pub use relationships::RelationshipStore;
pub use schema_registry::SchemaRegistry;
pub use subscription_dispatcher::SubscriptionDispatcher;
pub use tenant_kernel::TenantKernel;
pub use time_travel::{ReconstructAt, TimeTravelEngine};
pub use verb_executor::VerbExecutor;
