//! C9 — Integration dispatcher.
//!
//! Matches events against a fixed built-in hook table plus tenant-
//! configured routes (§4.9), dispatches to a named service via a
//! pluggable binding, and records every attempt in the dispatch log —
//! including the case where no binding exists for the named service.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use entity_types::{
    DispatchLogEntry, DispatchStatus, Event, IntegrationHook, IntegrationService, Result,
};
use serde_json::{json, Value};

use crate::ids::{builtin_hook_id, mint_dispatch_id};
use crate::ports::StorageEngine;

/// Header names identifying the event, entity, verb and hook on every
/// outbound integration request (§4.9 "headers identifying the event,
/// entity, verb, and hook id"), named in the same `X-Entity-*` family as
/// `KernelConfig`'s webhook headers.
pub const EVENT_HEADER: &str = "X-Entity-Event";
pub const ENTITY_TYPE_HEADER: &str = "X-Entity-Type";
pub const ENTITY_ID_HEADER: &str = "X-Entity-Id";
pub const VERB_HEADER: &str = "X-Entity-Verb";
pub const HOOK_ID_HEADER: &str = "X-Entity-Hook-Id";

/// An outbound binding for a named downstream service. Tenant kernels are
/// constructed with zero or more of these; a missing binding is not a
/// failure of the triggering event — it is recorded as a dispatch-log
/// error entry (§4.9).
#[async_trait]
pub trait ServiceBinding: Send + Sync {
    async fn call(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, String)],
        body: Option<Value>,
    ) -> std::result::Result<u16, String>;
}

/// A `reqwest`-backed binding that posts to a fixed base URL for the
/// service. Embedders may substitute their own `ServiceBinding` (e.g. an
/// in-process router) per service instead.
pub struct HttpServiceBinding {
    client: reqwest::Client,
    base_url: String,
}

impl HttpServiceBinding {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ServiceBinding for HttpServiceBinding {
    async fn call(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, String)],
        body: Option<Value>,
    ) -> std::result::Result<u16, String> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let verb = reqwest::Method::from_bytes(method.as_bytes()).map_err(|e| e.to_string())?;
        let mut req = self.client.request(verb.clone(), &url);
        for (name, value) in headers {
            req = req.header(*name, value);
        }
        if verb != reqwest::Method::GET && verb != reqwest::Method::HEAD {
            if let Some(b) = body {
                req = req.json(&b);
            }
        }
        let resp = req.send().await.map_err(|e| e.to_string())?;
        Ok(resp.status().as_u16())
    }
}

/// Fixed, tenant-unconfigurable built-in hooks (§4.9 table). Never
/// persisted — appended at match time, always active, cannot be deleted.
fn builtin_hooks() -> Vec<IntegrationHook> {
    const ROWS: &[(&str, &str, IntegrationService, &str)] = &[
        (
            "Contact",
            "qualify",
            IntegrationService::Payments,
            "POST /customers/sync",
        ),
        (
            "Contact",
            "create",
            IntegrationService::Payments,
            "POST /customers/sync",
        ),
        (
            "Deal",
            "close",
            IntegrationService::Payments,
            "POST /subscriptions/create",
        ),
        (
            "Issue",
            "create",
            IntegrationService::Repo,
            "POST /issues/create",
        ),
        (
            "Issue",
            "update",
            IntegrationService::Repo,
            "POST /issues/update",
        ),
        (
            "Issue",
            "close",
            IntegrationService::Repo,
            "POST /issues/close",
        ),
    ];
    ROWS.iter()
        .map(|(entity_type, verb, service, method)| IntegrationHook {
            id: builtin_hook_id(service.as_str(), method),
            entity_type: entity_type.to_string(),
            verb: verb.to_string(),
            service: *service,
            method: method.to_string(),
            config: None,
            active: true,
            created_at: Utc::now(),
            builtin: true,
        })
        .collect()
}

fn hook_matches(hook: &IntegrationHook, entity_type: &str, verb: &str) -> bool {
    hook.active
        && (hook.entity_type == "*" || hook.entity_type == entity_type)
        && (hook.verb == "*" || hook.verb == verb)
}

fn parse_method(method: &str) -> (String, String) {
    match method.split_once(' ') {
        Some((verb, path)) => (verb.to_ascii_uppercase(), path.to_string()),
        None => ("POST".to_string(), method.to_string()),
    }
}

pub struct IntegrationDispatcher {
    storage: Arc<dyn StorageEngine>,
    bindings: HashMap<IntegrationService, Arc<dyn ServiceBinding>>,
}

impl IntegrationDispatcher {
    pub fn new(
        storage: Arc<dyn StorageEngine>,
        bindings: HashMap<IntegrationService, Arc<dyn ServiceBinding>>,
    ) -> Self {
        Self { storage, bindings }
    }

    /// Built-ins plus tenant-registered hooks, builtins flagged
    /// (SPEC_FULL "Built-in integration hook listing").
    pub async fn list_hooks(&self) -> Result<Vec<IntegrationHook>> {
        let mut hooks = builtin_hooks();
        hooks.extend(self.storage.list_integration_hooks().await?);
        Ok(hooks)
    }

    /// Dispatches a newly appended event to every matching hook,
    /// concurrently, without waiting for the caller (§4.9 last line). This
    /// never surfaces an error to the verb caller — every outcome lands
    /// in the dispatch log (§7 propagation rule).
    pub async fn dispatch(&self, event: Event, context: String) {
        let hooks = match self.list_hooks().await {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load integration hooks for dispatch");
                return;
            }
        };

        let matching: Vec<IntegrationHook> = hooks
            .into_iter()
            .filter(|h| hook_matches(h, &event.entity_type, &event.verb))
            .collect();

        for hook in matching {
            let storage = self.storage.clone();
            let binding = self.bindings.get(&hook.service).cloned();
            let event = event.clone();
            let context = context.clone();
            tokio::spawn(async move {
                Self::dispatch_one(storage, binding, hook, event, context).await;
            });
        }
    }

    async fn dispatch_one(
        storage: Arc<dyn StorageEngine>,
        binding: Option<Arc<dyn ServiceBinding>>,
        hook: IntegrationHook,
        event: Event,
        context: String,
    ) {
        let (http_verb, path) = parse_method(&hook.method);
        let payload = json!({
            "event": event.event_type,
            "entityType": event.entity_type,
            "entityId": event.entity_id,
            "verb": event.verb,
            "conjugation": event.conjugation,
            "before": event.before,
            "after": event.after,
            "data": event.data,
            "context": context,
            "timestamp": event.timestamp,
        });

        let headers: Vec<(&str, String)> = vec![
            (EVENT_HEADER, event.event_type.clone()),
            (ENTITY_TYPE_HEADER, event.entity_type.clone()),
            (ENTITY_ID_HEADER, event.entity_id.clone()),
            (VERB_HEADER, event.verb.clone()),
            (HOOK_ID_HEADER, hook.id.clone()),
        ];

        let started = Instant::now();
        let outcome = match &binding {
            None => Err(format!(
                "Service binding '{}' not available",
                hook.service.as_str()
            )),
            Some(binding) => {
                let body = if http_verb == "GET" || http_verb == "HEAD" {
                    None
                } else {
                    Some(payload)
                };
                binding.call(&http_verb, &path, &headers, body).await
            }
        };
        let elapsed = started.elapsed().as_millis() as u64;

        let entry = match outcome {
            Ok(status_code) => {
                tracing::info!(
                    hook_id = %hook.id, service = hook.service.as_str(), status_code,
                    "integration dispatch succeeded"
                );
                DispatchLogEntry {
                    id: mint_dispatch_id(),
                    event_id: event.id.clone(),
                    hook_id: hook.id.clone(),
                    service: hook.service.as_str().to_string(),
                    method: hook.method.clone(),
                    status: DispatchStatus::Success,
                    status_code: Some(status_code),
                    error: None,
                    duration_ms: elapsed,
                    timestamp: Utc::now(),
                }
            }
            Err(err) => {
                tracing::warn!(
                    hook_id = %hook.id, service = hook.service.as_str(), error = %err,
                    "integration dispatch failed"
                );
                DispatchLogEntry {
                    id: mint_dispatch_id(),
                    event_id: event.id.clone(),
                    hook_id: hook.id.clone(),
                    service: hook.service.as_str().to_string(),
                    method: hook.method.clone(),
                    status: DispatchStatus::Error,
                    status_code: None,
                    error: Some(err),
                    duration_ms: elapsed,
                    timestamp: Utc::now(),
                }
            }
        };

        if let Err(e) = storage.append_dispatch_log(entry).await {
            tracing::error!(
                error = %e, event_id = %event.id, hook_id = %hook.id,
                "failed to append dispatch log entry"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;
    use std::sync::Mutex;

    /// Captures the headers and path of every call it receives and always
    /// succeeds with `200`; used to assert the identifying headers §4.9
    /// requires actually reach the binding.
    #[derive(Default)]
    struct RecordingBinding {
        calls: Mutex<Vec<(String, String, Vec<(String, String)>)>>,
    }

    #[async_trait]
    impl ServiceBinding for RecordingBinding {
        async fn call(
            &self,
            method: &str,
            path: &str,
            headers: &[(&str, String)],
            _body: Option<Value>,
        ) -> std::result::Result<u16, String> {
            self.calls.lock().unwrap().push((
                method.to_string(),
                path.to_string(),
                headers.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            ));
            Ok(200)
        }
    }

    fn sample_event(entity_type: &str, verb: &str) -> Event {
        Event {
            id: "evt_test".into(),
            event_type: Event::compose_type(entity_type, verb),
            entity_type: entity_type.to_string(),
            entity_id: "deal_test".into(),
            verb: verb.to_string(),
            conjugation: entity_types::Conjugation::new(verb, "closing", "closed"),
            data: None,
            before: None,
            after: None,
            sequence: 1,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn builtin_table_matches_deal_close() {
        let hooks = builtin_hooks();
        assert!(hooks
            .iter()
            .any(|h| h.entity_type == "Deal" && h.verb == "close" && h.builtin));
    }

    #[test]
    fn parse_method_defaults_to_post() {
        assert_eq!(parse_method("/customers/sync"), ("POST".into(), "/customers/sync".into()));
        assert_eq!(
            parse_method("POST /customers/sync"),
            ("POST".into(), "/customers/sync".into())
        );
    }

    #[tokio::test]
    async fn scenario_7_missing_binding_logs_error_entry() {
        let storage = Arc::new(MemoryStorage::new("t1"));
        let dispatcher = IntegrationDispatcher::new(storage.clone(), HashMap::new());
        dispatcher
            .dispatch(sample_event("Deal", "close"), "tenant://t1".into())
            .await;
        // dispatch() spawns; give the spawned task a tick to run.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let log = storage.list_dispatch_log(None).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].status, DispatchStatus::Error);
        assert!(log[0].error.as_ref().unwrap().contains("not available"));
    }

    #[tokio::test]
    async fn scenario_7_success_carries_identifying_headers() {
        let storage = Arc::new(MemoryStorage::new("t1"));
        let binding = Arc::new(RecordingBinding::default());
        let mut bindings: HashMap<IntegrationService, Arc<dyn ServiceBinding>> = HashMap::new();
        bindings.insert(IntegrationService::Payments, binding.clone());
        let dispatcher = IntegrationDispatcher::new(storage.clone(), bindings);

        dispatcher
            .dispatch(sample_event("Deal", "close"), "tenant://t1".into())
            .await;
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let log = storage.list_dispatch_log(None).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].status, DispatchStatus::Success);
        assert_eq!(log[0].status_code, Some(200));

        let calls = binding.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (method, path, headers) = &calls[0];
        assert_eq!(method, "POST");
        assert_eq!(path, "/subscriptions/create");
        let header = |name: &str| headers.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone());
        assert_eq!(header(EVENT_HEADER), Some("Deal.close".to_string()));
        assert_eq!(header(ENTITY_TYPE_HEADER), Some("Deal".to_string()));
        assert_eq!(header(ENTITY_ID_HEADER), Some("deal_test".to_string()));
        assert_eq!(header(VERB_HEADER), Some("close".to_string()));
        assert!(header(HOOK_ID_HEADER).is_some());
    }

    #[tokio::test]
    async fn non_matching_event_produces_no_dispatch() {
        let storage = Arc::new(MemoryStorage::new("t1"));
        let dispatcher = IntegrationDispatcher::new(storage.clone(), HashMap::new());
        dispatcher
            .dispatch(sample_event("Contact", "delete"), "tenant://t1".into())
            .await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let log = storage.list_dispatch_log(None).await.unwrap();
        assert!(log.is_empty());
    }
}
