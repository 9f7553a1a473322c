//! Retrieval engine — hybrid semantic + keyword search.
//!
//! [`search`] runs the two sub-searches concurrently and merges them.
//! Semantic hits carry `similarity = 1 - cosine distance`; keyword hits carry
//! a fixed 0.5 since no distance is computed. The merge deduplicates by chunk
//! id keeping the higher similarity, then sorts similarity descending with a
//! deterministic tie-break: `updated_at` descending, then id ascending.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::embedding::EmbeddingClient;
use crate::memory::store;
use crate::memory::types::{NoteRow, ScoredChunk};

/// Hybrid search over one agent's chunks.
///
/// A query whose keyword tokenization comes up empty is not an error: the
/// keyword path contributes nothing and the semantic path still runs.
pub async fn search(
    conn: &Connection,
    embedder: &dyn EmbeddingClient,
    agent_id: &str,
    query: &str,
    limit: usize,
) -> Result<Vec<ScoredChunk>> {
    let tokens = tokenize_query(query);

    let semantic = async {
        let embedding = embedder
            .embed(query)
            .await
            .context("query embedding failed")?;
        store::query_by_vector(conn, agent_id, &embedding, limit)
    };
    let keyword = async { store::query_by_keyword(conn, agent_id, &tokens, limit) };

    let (semantic, keyword) = tokio::join!(semantic, keyword);

    Ok(merge_results(semantic?, keyword?, limit))
}

/// Lowercase, split on whitespace, drop tokens of 2 characters or fewer.
pub fn tokenize_query(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Union both result sets, dedup by id keeping the higher similarity, sort,
/// and truncate.
fn merge_results(
    semantic: Vec<ScoredChunk>,
    keyword: Vec<ScoredChunk>,
    limit: usize,
) -> Vec<ScoredChunk> {
    let mut by_id: HashMap<String, ScoredChunk> = HashMap::new();
    for result in semantic.into_iter().chain(keyword) {
        match by_id.get(&result.id) {
            Some(existing) if existing.similarity >= result.similarity => {}
            _ => {
                by_id.insert(result.id.clone(), result);
            }
        }
    }

    let mut merged: Vec<ScoredChunk> = by_id.into_values().collect();
    merged.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.updated_at.cmp(&a.updated_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    merged.truncate(limit);
    merged
}

/// Daily-note chunks created within the last `days`, newest source first.
pub fn recent_notes(
    conn: &Connection,
    agent_id: &str,
    daily_prefix: &str,
    days: i64,
) -> Result<Vec<NoteRow>> {
    let since = (chrono::Utc::now() - chrono::Duration::days(days)).to_rfc3339();
    store::list_recent_by_prefix(conn, agent_id, daily_prefix, &since)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: &str, similarity: f64, updated_at: &str) -> ScoredChunk {
        ScoredChunk {
            id: id.to_string(),
            source_key: "MEMORY.md".to_string(),
            tags: vec!["Heading".to_string()],
            content: "some content".to_string(),
            importance: 5,
            created_at: updated_at.to_string(),
            updated_at: updated_at.to_string(),
            similarity,
        }
    }

    #[test]
    fn tokenize_drops_short_tokens() {
        assert_eq!(
            tokenize_query("What IS the Hetzner box"),
            vec!["what", "the", "hetzner", "box"]
        );
        assert!(tokenize_query("a an").is_empty());
        assert!(tokenize_query("   ").is_empty());
    }

    #[test]
    fn merge_keeps_higher_similarity_for_duplicates() {
        let semantic = vec![scored("1", 0.9, "2026-08-01")];
        let keyword = vec![scored("1", 0.5, "2026-08-01"), scored("2", 0.5, "2026-08-01")];

        let merged = merge_results(semantic, keyword, 5);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "1");
        assert_eq!(merged[0].similarity, 0.9);
        assert_eq!(merged[1].id, "2");
        assert_eq!(merged[1].similarity, 0.5);
    }

    #[test]
    fn merge_ordering_is_monotone_in_similarity() {
        let semantic = vec![
            scored("a", 0.3, "2026-08-01"),
            scored("b", 0.8, "2026-08-01"),
        ];
        let keyword = vec![scored("c", 0.5, "2026-08-01")];

        let merged = merge_results(semantic, keyword, 5);
        for pair in merged.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[test]
    fn merge_tie_break_recency_then_id() {
        // Three keyword hits all at 0.5: newest updated_at first, then id asc
        let keyword = vec![
            scored("c", 0.5, "2026-08-01"),
            scored("a", 0.5, "2026-08-03"),
            scored("b", 0.5, "2026-08-03"),
        ];

        let merged = merge_results(Vec::new(), keyword, 5);
        let ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn merge_truncates_to_limit() {
        let keyword = (0..10)
            .map(|i| scored(&format!("id-{i}"), 0.5, "2026-08-01"))
            .collect();
        let merged = merge_results(Vec::new(), keyword, 3);
        assert_eq!(merged.len(), 3);
    }
}
