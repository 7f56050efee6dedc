use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Deactivated,
}

/// Per-tenant metadata (§3). Deactivation retains all data; the kernel
/// can be reactivated (§4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantMetadata {
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    pub status: TenantStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub name: Option<String>,
    pub plan: Option<String>,
    #[serde(rename = "deactivatedAt")]
    pub deactivated_at: Option<DateTime<Utc>>,
}
