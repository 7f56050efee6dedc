use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A directed relationship edge. Primary key is the triple itself — the
/// same edge cannot exist twice (§3). Stored as a flat row with a reverse
/// lookup index, never as an object graph with owning pointers (§9).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
