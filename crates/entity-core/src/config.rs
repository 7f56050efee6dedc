//! A4 — configuration.
//!
//! Tenant storage DSN, outbound concurrency and HMAC defaults are read
//! from environment variables with `std::env::var(...).unwrap_or_else`
//! fallbacks, matching `sem_os_server::main`'s `SEM_OS_*` handling. No
//! config-file format is invented beyond what the teacher already does
//! inline.

use std::time::Duration;

/// Tuning knobs for a tenant kernel's dispatch behavior. Constructed once
/// at kernel creation and never mutated afterward.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Per-call timeout for outbound webhook/integration HTTP calls (§5
    /// "Outbound dispatches have per-call timeouts defined by the
    /// transport").
    pub outbound_timeout: Duration,
    /// Header name the subscription dispatcher signs webhook bodies with
    /// (§4.8, §6 "Webhook delivery headers").
    pub signature_header: String,
    /// Header name carrying the composed event type (§4.8, §6).
    pub event_header: String,
    /// Header name carrying the per-delivery id (§4.8, §6).
    pub delivery_header: String,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl KernelConfig {
    pub fn from_env() -> Self {
        let timeout_ms: u64 = std::env::var("ENTITY_ENGINE_OUTBOUND_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5_000);
        Self {
            outbound_timeout: Duration::from_millis(timeout_ms),
            signature_header: std::env::var("ENTITY_ENGINE_SIGNATURE_HEADER")
                .unwrap_or_else(|_| "X-Entity-Signature".to_string()),
            event_header: std::env::var("ENTITY_ENGINE_EVENT_HEADER")
                .unwrap_or_else(|_| "X-Entity-Event".to_string()),
            delivery_header: std::env::var("ENTITY_ENGINE_DELIVERY_HEADER")
                .unwrap_or_else(|_| "X-Entity-Delivery".to_string()),
        }
    }
}

/// Reads `DATABASE_URL` the way `sem_os_server::main` reads
/// `SEM_OS_DATABASE_URL` — required, no fallback, because a missing DSN
/// is a deployment error, not a default worth guessing.
pub fn database_url_from_env() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set")
}
