//! Tenant kernel registry.
//!
//! Kernels are created lazily on first access to a tenant id and cached
//! for the lifetime of the process (§4.11). One `PgPool` is shared across
//! every tenant's `PgStorageEngine`; isolation between tenants is the
//! schema-per-tenant split `entity-postgres` already provides, not a
//! separate connection pool per tenant.

use std::collections::HashMap;
use std::sync::Arc;

use entity_core::{KernelConfig, ServiceBinding, TenantKernel};
use entity_postgres::PgStorageEngine;
use entity_types::{EngineError, IntegrationService, Result};
use sqlx::PgPool;
use tokio::sync::RwLock;

pub struct AppState {
    pool: PgPool,
    config: KernelConfig,
    service_bindings: HashMap<IntegrationService, Arc<dyn ServiceBinding>>,
    kernels: RwLock<HashMap<String, Arc<TenantKernel>>>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: KernelConfig,
        service_bindings: HashMap<IntegrationService, Arc<dyn ServiceBinding>>,
    ) -> Self {
        Self {
            pool,
            config,
            service_bindings,
            kernels: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached kernel for `tenant_id`, provisioning its schema
    /// and constructing a fresh kernel on first access.
    pub async fn kernel(&self, tenant_id: &str) -> Result<Arc<TenantKernel>> {
        if let Some(kernel) = self.kernels.read().await.get(tenant_id) {
            return Ok(kernel.clone());
        }

        let mut kernels = self.kernels.write().await;
        if let Some(kernel) = kernels.get(tenant_id) {
            return Ok(kernel.clone());
        }

        if tenant_id.is_empty() || !tenant_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(EngineError::BadInput(format!("invalid tenant id '{tenant_id}'")));
        }

        let storage = PgStorageEngine::connect(self.pool.clone(), tenant_id).await?;
        let kernel = Arc::new(TenantKernel::new(
            tenant_id,
            Arc::new(storage),
            self.config.clone(),
            self.service_bindings.clone(),
        ));
        kernels.insert(tenant_id.to_string(), kernel.clone());
        Ok(kernel)
    }
}
