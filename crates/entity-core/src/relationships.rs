//! Supplemented relationship-edge operations (SPEC_FULL "Relationship
//! edge operations"). spec.md §3 defines the `RelationshipEdge` type and
//! §9 describes its storage shape as flat rows with a reverse index, but
//! §4 never gives it an operation contract — this is the minimal surface
//! that fills that gap.

use std::sync::Arc;

use chrono::Utc;
use entity_types::{RelationshipEdge, Result};

use crate::ports::StorageEngine;

pub struct RelationshipStore {
    storage: Arc<dyn StorageEngine>,
}

impl RelationshipStore {
    pub fn new(storage: Arc<dyn StorageEngine>) -> Self {
        Self { storage }
    }

    /// Idempotent insert — primary key is the triple itself, so linking
    /// the same edge twice is a no-op (§3).
    pub async fn link(&self, subject: &str, predicate: &str, object: &str) -> Result<()> {
        self.storage
            .link(RelationshipEdge {
                subject: subject.to_string(),
                predicate: predicate.to_string(),
                object: object.to_string(),
                created_at: Utc::now(),
            })
            .await
    }

    pub async fn unlink(&self, subject: &str, predicate: &str, object: &str) -> Result<()> {
        self.storage.unlink(subject, predicate, object).await
    }

    pub async fn forward(&self, subject: &str, predicate: &str) -> Result<Vec<RelationshipEdge>> {
        self.storage.forward(subject, predicate).await
    }

    pub async fn reverse(&self, object: &str, predicate: &str) -> Result<Vec<RelationshipEdge>> {
        self.storage.reverse(object, predicate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;

    #[tokio::test]
    async fn link_is_idempotent() {
        let storage = Arc::new(MemoryStorage::new("t1"));
        let rels = RelationshipStore::new(storage);
        rels.link("contact_1", "ownedBy", "user_1").await.unwrap();
        rels.link("contact_1", "ownedBy", "user_1").await.unwrap();
        let forward = rels.forward("contact_1", "ownedBy").await.unwrap();
        assert_eq!(forward.len(), 1);
    }

    #[tokio::test]
    async fn reverse_index_finds_edge_from_object_side() {
        let storage = Arc::new(MemoryStorage::new("t1"));
        let rels = RelationshipStore::new(storage);
        rels.link("contact_1", "ownedBy", "user_1").await.unwrap();
        let reverse = rels.reverse("user_1", "ownedBy").await.unwrap();
        assert_eq!(reverse.len(), 1);
        assert_eq!(reverse[0].subject, "contact_1");
    }

    #[tokio::test]
    async fn unlink_removes_the_edge() {
        let storage = Arc::new(MemoryStorage::new("t1"));
        let rels = RelationshipStore::new(storage);
        rels.link("contact_1", "ownedBy", "user_1").await.unwrap();
        rels.unlink("contact_1", "ownedBy", "user_1").await.unwrap();
        assert!(rels.forward("contact_1", "ownedBy").await.unwrap().is_empty());
    }
}
