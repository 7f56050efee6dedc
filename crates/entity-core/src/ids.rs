//! C1 — Identifier minter.
//!
//! Produces opaque `prefix_XXXXX` identifiers drawn from a fixed
//! 62-character alphabet (§4.1). Pure and infallible; callers that need
//! primary-key collision retries own that concern, not this module.

use rand::Rng;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const ENTITY_SUFFIX_LEN: usize = 10;
pub const EVENT_SUFFIX_LEN: usize = 12;
pub const SUBSCRIPTION_SUFFIX_LEN: usize = 12;
pub const HOOK_SUFFIX_LEN: usize = 12;
pub const DISPATCH_SUFFIX_LEN: usize = 12;

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

pub fn mint(prefix: &str, suffix_len: usize) -> String {
    format!("{prefix}_{}", random_suffix(suffix_len))
}

/// Entity ids are `{type-lowercased}_{short-id}` (§6), not a fixed prefix.
pub fn mint_entity_id(entity_type: &str) -> String {
    mint(&entity_type.to_lowercase(), ENTITY_SUFFIX_LEN)
}

pub fn mint_event_id() -> String {
    mint("evt", EVENT_SUFFIX_LEN)
}

pub fn mint_subscription_id() -> String {
    mint("sub", SUBSCRIPTION_SUFFIX_LEN)
}

pub fn mint_hook_id() -> String {
    mint("ihook", HOOK_SUFFIX_LEN)
}

pub fn mint_dispatch_id() -> String {
    mint("dsp", DISPATCH_SUFFIX_LEN)
}

/// Built-in integration hook ids follow a fixed, deterministic shape
/// instead of a random suffix — they are not minted, they are derived
/// from the (service, method) pair so the same built-in always has the
/// same id (§6).
pub fn builtin_hook_id(service: &str, method: &str) -> String {
    format!("builtin:{service}:{method}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_uses_lowercased_type_and_correct_suffix_len() {
        let id = mint_entity_id("Contact");
        assert!(id.starts_with("contact_"));
        assert_eq!(id.len(), "contact_".len() + ENTITY_SUFFIX_LEN);
    }

    #[test]
    fn event_id_has_evt_prefix() {
        let id = mint_event_id();
        assert!(id.starts_with("evt_"));
        assert_eq!(id.len(), "evt_".len() + EVENT_SUFFIX_LEN);
    }

    #[test]
    fn alphabet_only_characters_appear_in_suffix() {
        let id = mint_subscription_id();
        let suffix = id.strip_prefix("sub_").unwrap();
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn builtin_hook_id_is_deterministic() {
        assert_eq!(
            builtin_hook_id("PAYMENTS", "POST /customers/sync"),
            "builtin:PAYMENTS:POST /customers/sync"
        );
    }
}
