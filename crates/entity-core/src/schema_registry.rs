//! C3 — Schema registry.
//!
//! Stores noun schemas per tenant and caches parsed schemas in memory.
//! The cache is a plain owned field of the registry (§9 "Global mutable
//! state" — no process-global singleton); it is lazily hydrated on first
//! access and wholly invalidated on every write (§4.3).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use entity_types::{Conjugation, EngineError, NounDefinition, NounSchema, Result};

use crate::conjugator::conjugate;
use crate::ports::StorageEngine;

const DEFAULT_VERBS: &[&str] = &["create", "update", "delete"];

pub fn is_pascal_case(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return false,
    }
    !name.is_empty() && chars.all(|c| c.is_ascii_alphanumeric())
}

fn default_slug(name: &str) -> String {
    let mut slug = String::new();
    for (i, c) in name.char_indices() {
        if i > 0 && c.is_uppercase() {
            slug.push('-');
        }
        slug.push(c.to_ascii_lowercase());
    }
    slug
}

fn default_plural(singular: &str) -> String {
    if singular.ends_with('y') && singular.len() > 1 {
        let chars: Vec<char> = singular.chars().collect();
        let n = chars.len();
        if !"aeiouAEIOU".contains(chars[n - 2]) {
            return format!("{}ies", &singular[..singular.len() - 1]);
        }
    }
    if singular.ends_with('s') || singular.ends_with("ch") || singular.ends_with("sh") {
        return format!("{singular}es");
    }
    format!("{singular}s")
}

pub struct SchemaRegistry {
    storage: Arc<dyn StorageEngine>,
    cache: RwLock<Option<HashMap<String, NounSchema>>>,
}

impl SchemaRegistry {
    pub fn new(storage: Arc<dyn StorageEngine>) -> Self {
        Self {
            storage,
            cache: RwLock::new(None),
        }
    }

    async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }

    async fn hydrate(&self) -> Result<HashMap<String, NounSchema>> {
        let nouns = self.storage.list_nouns().await?;
        Ok(nouns.into_iter().map(|n| (n.name.clone(), n)).collect())
    }

    /// Registers (or replaces) a noun schema. Re-registration wholly
    /// replaces the prior schema — nouns are never deleted in-place
    /// (§4.3).
    pub async fn define_noun(&self, name: &str, definition: NounDefinition) -> Result<NounSchema> {
        if !is_pascal_case(name) {
            return Err(EngineError::BadInput(format!(
                "noun name '{name}' is not PascalCase"
            )));
        }

        let mut verbs: HashMap<String, Conjugation> = HashMap::new();
        for verb in DEFAULT_VERBS {
            if !definition.disabled_verbs.contains(*verb) {
                verbs.insert((*verb).to_string(), conjugate(verb));
            }
        }
        for verb in &definition.verbs {
            verbs.insert(verb.clone(), conjugate(verb));
        }

        let singular = definition.singular.clone().unwrap_or_else(|| name.to_string());
        let schema = NounSchema {
            name: name.to_string(),
            singular: singular.clone(),
            plural: definition.plural.clone().unwrap_or_else(|| default_plural(&singular)),
            slug: definition.slug.clone().unwrap_or_else(|| default_slug(name)),
            fields: definition.fields,
            verbs,
            disabled_verbs: definition.disabled_verbs,
            created_at: Utc::now(),
        };

        self.storage.put_noun(schema.clone()).await?;
        self.invalidate().await;
        Ok(schema)
    }

    pub async fn list_nouns(&self) -> Result<Vec<NounSchema>> {
        {
            let cache = self.cache.read().await;
            if let Some(map) = cache.as_ref() {
                return Ok(map.values().cloned().collect());
            }
        }
        let map = self.hydrate().await?;
        let values = map.values().cloned().collect();
        let mut cache = self.cache.write().await;
        *cache = Some(map);
        Ok(values)
    }

    pub async fn get_noun(&self, name: &str) -> Result<Option<NounSchema>> {
        {
            let cache = self.cache.read().await;
            if let Some(map) = cache.as_ref() {
                return Ok(map.get(name).cloned());
            }
        }
        let map = self.hydrate().await?;
        let result = map.get(name).cloned();
        let mut cache = self.cache.write().await;
        *cache = Some(map);
        Ok(result)
    }

    /// Flattens every schema's verb map into `verb -> (conjugation, [noun
    /// names])`, deduplicated (§4.3).
    pub async fn list_verbs(&self) -> Result<HashMap<String, (Conjugation, Vec<String>)>> {
        let nouns = self.list_nouns().await?;
        let mut out: HashMap<String, (Conjugation, Vec<String>)> = HashMap::new();
        for noun in nouns {
            for (verb, conjugation) in noun.verbs {
                let entry = out
                    .entry(verb)
                    .or_insert_with(|| (conjugation.clone(), Vec::new()));
                if !entry.1.contains(&noun.name) {
                    entry.1.push(noun.name.clone());
                }
            }
        }
        Ok(out)
    }

    /// Searches by action, activity, or event form, returning all
    /// `(noun, verb, conjugation)` matches (§4.3).
    pub async fn find_verb_by_any_form(
        &self,
        form: &str,
    ) -> Result<Vec<(String, String, Conjugation)>> {
        let nouns = self.list_nouns().await?;
        let mut matches = Vec::new();
        for noun in nouns {
            for (verb, conjugation) in &noun.verbs {
                if conjugation.action == form || conjugation.activity == form || conjugation.event == form {
                    matches.push((noun.name.clone(), verb.clone(), conjugation.clone()));
                }
            }
        }
        Ok(matches)
    }

    pub async fn register_hook(
        &self,
        hook: entity_types::HookRegistration,
    ) -> Result<()> {
        self.storage.register_hook(hook).await
    }

    pub async fn list_hooks(
        &self,
        noun: Option<&str>,
        verb: Option<&str>,
    ) -> Result<Vec<entity_types::HookRegistration>> {
        self.storage.list_hooks(noun, verb).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new(Arc::new(MemoryStorage::new("t1")))
    }

    #[tokio::test]
    async fn define_noun_rejects_non_pascal_case() {
        let reg = registry();
        let err = reg.define_noun("contact", NounDefinition::default()).await.unwrap_err();
        assert!(matches!(err, EngineError::BadInput(_)));
    }

    #[tokio::test]
    async fn define_noun_adds_default_verbs() {
        let reg = registry();
        let schema = reg.define_noun("Contact", NounDefinition::default()).await.unwrap();
        assert!(schema.verbs.contains_key("create"));
        assert!(schema.verbs.contains_key("update"));
        assert!(schema.verbs.contains_key("delete"));
    }

    #[tokio::test]
    async fn define_noun_respects_disabled_markers() {
        let reg = registry();
        let mut def = NounDefinition::default();
        def.disabled_verbs.insert("delete".into());
        let schema = reg.define_noun("Contact", def).await.unwrap();
        assert!(!schema.verbs.contains_key("delete"));
        assert!(schema.disabled_verbs.contains("delete"));
    }

    #[tokio::test]
    async fn list_nouns_contains_defined_noun() {
        let reg = registry();
        reg.define_noun("Contact", NounDefinition::default()).await.unwrap();
        let names: Vec<String> = reg.list_nouns().await.unwrap().into_iter().map(|n| n.name).collect();
        assert!(names.contains(&"Contact".to_string()));
    }

    #[tokio::test]
    async fn redefine_replaces_prior_schema() {
        let reg = registry();
        reg.define_noun("Contact", NounDefinition::default()).await.unwrap();
        let mut def = NounDefinition::default();
        def.verbs.push("qualify".into());
        reg.define_noun("Contact", def).await.unwrap();
        let schema = reg.get_noun("Contact").await.unwrap().unwrap();
        assert!(schema.verbs.contains_key("qualify"));
    }

    #[tokio::test]
    async fn find_verb_by_any_form_matches_event_form() {
        let reg = registry();
        reg.define_noun("Contact", NounDefinition::default()).await.unwrap();
        let matches = reg.find_verb_by_any_form("created").await.unwrap();
        assert!(matches.iter().any(|(n, v, _)| n == "Contact" && v == "create"));
    }
}
