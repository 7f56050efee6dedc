//! PostgreSQL adapter implementing `entity_core::StorageEngine`,
//! schema-per-tenant.
//!
//! `PgStorageEngine` owns a `PgPool` and a fixed tenant schema name; every
//! query it issues is scoped to that schema, giving structural tenant
//! isolation (§4.11/§5) without a shared-table `tenant_id` column. Call
//! [`schema::ensure_schema`] once per tenant before constructing the
//! engine (or let [`PgStorageEngine::connect`] do both).

pub mod engine;
pub mod rows;
pub mod schema;

pub use engine::PgStorageEngine;
pub use schema::schema_name;
