//! Boot context assembler — the startup bundle for an agent.
//!
//! Two tiers of chunks feed the bundle: everything at or above the importance
//! floor, then daily notes created in the recent window. A chunk present in
//! both tiers contributes one line; the importance tier wins the tie because
//! it is concatenated first.

use anyhow::Result;
use rusqlite::Connection;
use std::collections::HashSet;

use crate::memory::store;
use crate::memory::types::{BootContext, BootStats};

/// Knobs for boot-context assembly, taken from [`crate::config::BootConfig`].
pub struct BootParams<'a> {
    pub importance_floor: i64,
    pub recent_days: i64,
    pub entity_limit: usize,
    /// Source-key prefix identifying daily notes (e.g. `notes/`).
    pub daily_prefix: &'a str,
}

/// Assemble the boot bundle for one agent scope.
///
/// `stats.total_entities` reports the store's true scoped total even though
/// the rendered entity list is bounded by `entity_limit`; both stats describe
/// the store, not the sample.
pub fn boot_context(conn: &Connection, agent_id: &str, params: &BootParams) -> Result<BootContext> {
    let important = store::list_high_importance(conn, agent_id, params.importance_floor)?;
    let since = (chrono::Utc::now() - chrono::Duration::days(params.recent_days)).to_rfc3339();
    let recent = store::list_recent_by_prefix(conn, agent_id, params.daily_prefix, &since)?;

    // Dedup by logical key, first occurrence wins (importance tier first)
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut memories = Vec::new();
    for row in important.iter().chain(recent.iter()) {
        let key = (row.source_key.clone(), row.primary_tag().to_string());
        if seen.insert(key) {
            memories.push(format!("[{}] {}", row.source_key, row.content));
        }
    }

    let entities = store::list_entities(conn, agent_id, params.entity_limit)?
        .into_iter()
        .map(|e| format!("{} ({})", e.name, e.entity_type))
        .collect();

    let stats = BootStats {
        total_memories: store::count_chunks(conn, agent_id)?,
        total_entities: store::count_entities(conn, agent_id)?,
    };

    Ok(BootContext {
        memories,
        entities,
        stats,
    })
}
