//! Core data types for the chunk store and retrieval engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stored unit of knowledge: one heading-delimited section of a source
/// document, matching the `chunks` table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// UUID v7 (time-sortable) primary key, immutable once created.
    pub id: String,
    /// Scope partition; sync and retrieval operate within one agent.
    pub agent_id: String,
    /// Originating document, e.g. `MEMORY.md` or `notes/2026-08-27.md`.
    pub source_key: String,
    /// Ordered tags; the first is the chunk's heading and forms its logical
    /// key together with `source_key`.
    pub tags: Vec<String>,
    /// Text body, always longer than 20 characters after trimming.
    pub content: String,
    /// Priority used for ranking and boot-context selection.
    pub importance: i64,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 timestamp of the last content-changing update.
    pub updated_at: String,
}

impl Chunk {
    /// The heading tag that keys this chunk within its source.
    pub fn primary_tag(&self) -> &str {
        self.tags.first().map(String::as_str).unwrap_or("")
    }
}

/// A retrieval result: chunk fields plus the similarity that ranked it.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub id: String,
    pub source_key: String,
    pub tags: Vec<String>,
    pub content: String,
    pub importance: i64,
    pub created_at: String,
    pub updated_at: String,
    /// `1 - cosine distance` for semantic hits, fixed 0.5 for keyword hits.
    pub similarity: f64,
}

/// Counts reported by one sync run. All non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounts {
    pub inserted: u32,
    pub updated: u32,
    pub skipped: u32,
    pub deleted: u32,
}

impl SyncCounts {
    /// Accumulate another run's counts (whole-corpus totals).
    pub fn merge(&mut self, other: SyncCounts) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.deleted += other.deleted;
    }
}

impl std::fmt::Display for SyncCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "+{} ~{} ={} -{}",
            self.inserted, self.updated, self.skipped, self.deleted
        )
    }
}

/// A closed variant for entity properties: freeform JSON is rejected at the
/// store boundary, only these shapes pass validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    String(String),
    Map(BTreeMap<String, PropertyValue>),
}

/// A known entity (person, project, system), written by external tooling and
/// surfaced in the boot context.
#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub entity_type: String,
    pub properties: BTreeMap<String, PropertyValue>,
}

/// A chunk row as surfaced by boot context and recent-notes listings.
#[derive(Debug, Clone, Serialize)]
pub struct NoteRow {
    pub source_key: String,
    pub tags: Vec<String>,
    pub content: String,
}

impl NoteRow {
    pub fn primary_tag(&self) -> &str {
        self.tags.first().map(String::as_str).unwrap_or("")
    }
}

/// The startup bundle: deduplicated memory lines, known entities, and counts.
#[derive(Debug, Serialize)]
pub struct BootContext {
    /// Lines formatted `"[source_key] content"`, importance tier first.
    pub memories: Vec<String>,
    /// Lines formatted `"name (type)"`, bounded by the entity limit.
    pub entities: Vec<String>,
    pub stats: BootStats,
}

/// Boot-context totals. Both report the store's true scoped counts, not the
/// bounded sample sizes returned in the bundle.
#[derive(Debug, Serialize)]
pub struct BootStats {
    pub total_memories: u64,
    pub total_entities: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_counts_display_and_merge() {
        let mut totals = SyncCounts::default();
        totals.merge(SyncCounts {
            inserted: 2,
            updated: 1,
            skipped: 3,
            deleted: 0,
        });
        totals.merge(SyncCounts {
            inserted: 0,
            updated: 0,
            skipped: 5,
            deleted: 1,
        });
        assert_eq!(totals.to_string(), "+2 ~1 =8 -1");
    }

    #[test]
    fn property_value_rejects_open_shapes() {
        // Arrays and nulls are not part of the closed variant.
        assert!(serde_json::from_str::<PropertyValue>("[1, 2]").is_err());
        assert!(serde_json::from_str::<PropertyValue>("null").is_err());

        let nested: PropertyValue =
            serde_json::from_str(r#"{"region": "eu-west", "cores": 8, "managed": true}"#)
                .unwrap();
        match nested {
            PropertyValue::Map(map) => {
                assert_eq!(map["region"], PropertyValue::String("eu-west".into()));
                assert_eq!(map["cores"], PropertyValue::Number(8.0));
                assert_eq!(map["managed"], PropertyValue::Bool(true));
            }
            other => panic!("expected map, got {other:?}"),
        }
    }
}
