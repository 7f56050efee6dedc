//! C8 — Subscription dispatcher.
//!
//! Matches events against the two-segment pattern grammar (§4.8, §9 Open
//! Questions — no hierarchical globs) and POSTs signed payloads to
//! webhook endpoints. Dispatch is fire-and-forget: errors are swallowed
//! and must never block the request that caused the event (§4.8, §7).

use hmac::{Hmac, Mac};
use sha2::Sha256;

use entity_types::{Event, Subscription};

use crate::config::KernelConfig;
use crate::ids::mint;

type HmacSha256 = Hmac<Sha256>;

/// `"*"` matches every event; otherwise a pattern is `{entity}.{verb}`
/// where either side may be a literal `*` (§4.8). Exact equality succeeds
/// when neither side is a wildcard (I-Pattern).
pub fn pattern_matches(pattern: &str, event_type: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    let Some((p_entity, p_verb)) = pattern.split_once('.') else {
        return pattern == event_type;
    };
    let Some((e_entity, e_verb)) = event_type.split_once('.') else {
        return false;
    };
    (p_entity == "*" || p_entity == e_entity) && (p_verb == "*" || p_verb == e_verb)
}

fn sign(secret: &str, body: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

pub struct SubscriptionDispatcher {
    client: reqwest::Client,
    event_header: String,
    delivery_header: String,
    signature_header: String,
}

impl SubscriptionDispatcher {
    pub fn new(config: &KernelConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.outbound_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            event_header: config.event_header.clone(),
            delivery_header: config.delivery_header.clone(),
            signature_header: config.signature_header.clone(),
        }
    }

    /// Fans a newly appended event out to every active subscription whose
    /// pattern matches (§4.8). Spawns one task per match and returns
    /// immediately — ordering across subscriptions is not guaranteed.
    pub fn dispatch(&self, event: Event, subscriptions: Vec<Subscription>) {
        let body = match serde_json::to_string(&event) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize event for webhook dispatch");
                return;
            }
        };

        for sub in subscriptions {
            if !sub.active || !pattern_matches(&sub.pattern, &event.event_type) {
                continue;
            }
            let client = self.client.clone();
            let body = body.clone();
            let event_type = event.event_type.clone();
            let event_header = self.event_header.clone();
            let delivery_header = self.delivery_header.clone();
            let signature_header = self.signature_header.clone();
            tokio::spawn(async move {
                let delivery_id = mint("whd", 12);
                let mut req = client
                    .post(&sub.endpoint)
                    .header("Content-Type", "application/json")
                    .header(event_header, event_type.clone())
                    .header(delivery_header, delivery_id.clone())
                    .body(body.clone());
                if let Some(secret) = &sub.secret {
                    req = req.header(signature_header, sign(secret, &body));
                }
                match req.send().await {
                    Ok(resp) => tracing::debug!(
                        subscription = %sub.id,
                        status = resp.status().as_u16(),
                        delivery_id,
                        "webhook delivered"
                    ),
                    Err(e) => tracing::warn!(
                        subscription = %sub.id,
                        error = %e,
                        delivery_id,
                        "webhook dispatch failed (swallowed, not surfaced to caller)"
                    ),
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_everything() {
        assert!(pattern_matches("*", "Contact.create"));
        assert!(pattern_matches("*", "Deal.close"));
    }

    #[test]
    fn exact_pattern_matches_only_itself() {
        assert!(pattern_matches("Contact.create", "Contact.create"));
        assert!(!pattern_matches("Contact.create", "Contact.update"));
        assert!(!pattern_matches("Contact.create", "Deal.create"));
    }

    #[test]
    fn wildcard_verb_matches_any_verb_on_entity() {
        assert!(pattern_matches("Contact.*", "Contact.create"));
        assert!(pattern_matches("Contact.*", "Contact.qualify"));
        assert!(!pattern_matches("Contact.*", "Deal.create"));
    }

    #[test]
    fn wildcard_entity_matches_any_entity_for_verb() {
        assert!(pattern_matches("*.create", "Contact.create"));
        assert!(pattern_matches("*.create", "Deal.create"));
        assert!(!pattern_matches("*.create", "Deal.close"));
    }

    #[test]
    fn hmac_signature_has_sha256_prefix_and_64_hex_chars() {
        let sig = sign("s3cr3t", "{}");
        assert!(sig.starts_with("sha256="));
        assert_eq!(sig.strip_prefix("sha256=").unwrap().len(), 64);
    }

    #[test]
    fn hmac_signature_is_deterministic() {
        assert_eq!(sign("k", "body"), sign("k", "body"));
        assert_ne!(sign("k", "body"), sign("k", "other"));
    }
}
