//! SQL DDL for all mnema tables.
//!
//! Defines the `chunks`, `chunks_vec` (vec0), `entities`, and `schema_meta`
//! tables. All DDL uses `IF NOT EXISTS` for idempotent initialization.
//!
//! The `chunks` table enforces at most one live chunk per
//! `(agent_id, source_key, primary_tag)` via a uniqueness constraint; the
//! sync engine relies on the store rejecting conflicting concurrent inserts.

use rusqlite::Connection;

use crate::embedding::EMBEDDING_DIM;

/// All schema DDL statements for mnema's core tables.
const SCHEMA_SQL: &str = r#"
-- Knowledge chunks, one row per (source document, heading)
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    agent_id TEXT NOT NULL,
    source_key TEXT NOT NULL,
    primary_tag TEXT NOT NULL,
    tags TEXT NOT NULL,
    content TEXT NOT NULL CHECK(length(content) > 0),
    importance INTEGER NOT NULL DEFAULT 5,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(agent_id, source_key, primary_tag)
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(agent_id, source_key);
CREATE INDEX IF NOT EXISTS idx_chunks_importance ON chunks(agent_id, importance);
CREATE INDEX IF NOT EXISTS idx_chunks_created ON chunks(agent_id, created_at);

-- Known entities (people, projects, systems) — written by external tooling
CREATE TABLE IF NOT EXISTS entities (
    id TEXT PRIMARY KEY,
    agent_id TEXT NOT NULL,
    name TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    properties TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entities_agent ON entities(agent_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // vec0 virtual table must be created separately (sqlite-vec syntax).
    // Cosine metric so that similarity = 1 - distance holds directly.
    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS chunks_vec USING vec0(\
             id TEXT PRIMARY KEY,\
             embedding FLOAT[{EMBEDDING_DIM}] distance_metric=cosine\
         );"
    ))?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
