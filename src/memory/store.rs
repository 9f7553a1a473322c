//! Chunk store adapter over SQLite + sqlite-vec.
//!
//! All reads and writes are scoped by `agent_id`. Writes that touch content
//! also touch the vector table in the same transaction, so a stored
//! embedding can never be stale relative to a committed update. The store
//! serializes conflicting writes to one `(source_key, primary_tag)` key via
//! the uniqueness constraint; [`insert_chunk`] tolerates losing that race by
//! retrying as an update.

use anyhow::{anyhow, bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;

use crate::memory::embedding_to_bytes;
use crate::memory::types::{Chunk, Entity, NoteRow, PropertyValue, ScoredChunk};

/// Fields for a chunk about to be inserted.
pub struct NewChunk<'a> {
    pub agent_id: &'a str,
    pub source_key: &'a str,
    pub heading: &'a str,
    pub content: &'a str,
    pub importance: i64,
    pub embedding: &'a [f32],
}

/// What an insert actually did once the store had its say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was created with this id.
    Inserted(String),
    /// A concurrent writer created the key first; the insert was retried as
    /// an update of that row.
    RacedAsUpdate(String),
}

// ── Chunk lookups ─────────────────────────────────────────────────────────────

/// The live chunk at `(source_key, tag)`, if any.
pub fn find_by_key(
    conn: &Connection,
    agent_id: &str,
    source_key: &str,
    tag: &str,
) -> Result<Option<Chunk>> {
    let row = conn
        .query_row(
            "SELECT id, agent_id, source_key, tags, content, importance, created_at, updated_at \
             FROM chunks WHERE agent_id = ?1 AND source_key = ?2 AND primary_tag = ?3",
            params![agent_id, source_key, tag],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            },
        )
        .optional()
        .context("chunk lookup failed")?;

    row.map(|(id, agent_id, source_key, tags, content, importance, created_at, updated_at)| {
        Ok(Chunk {
            id,
            agent_id,
            source_key,
            tags: parse_tags(&tags)?,
            content,
            importance,
            created_at,
            updated_at,
        })
    })
    .transpose()
}

/// All live `(id, primary_tag)` pairs for one source document.
pub fn list_by_source(
    conn: &Connection,
    agent_id: &str,
    source_key: &str,
) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT id, primary_tag FROM chunks WHERE agent_id = ?1 AND source_key = ?2",
    )?;
    let rows = stmt
        .query_map(params![agent_id, source_key], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Chunk writes ──────────────────────────────────────────────────────────────

/// Insert a new chunk and its embedding in one transaction.
///
/// If the `(agent_id, source_key, primary_tag)` key already exists — a
/// concurrent sync won the race — the rejected insert is retried as an
/// update of the existing row instead of failing.
pub fn insert_chunk(conn: &mut Connection, new: &NewChunk) -> Result<InsertOutcome> {
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let tags_json = serde_json::to_string(&[new.heading])?;

    let tx = conn.transaction()?;
    let inserted = tx.execute(
        "INSERT INTO chunks (id, agent_id, source_key, primary_tag, tags, content, importance, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            id,
            new.agent_id,
            new.source_key,
            new.heading,
            tags_json,
            new.content,
            new.importance,
            now,
        ],
    );

    match inserted {
        Ok(_) => {
            tx.execute(
                "INSERT INTO chunks_vec (id, embedding) VALUES (?1, ?2)",
                params![id, embedding_to_bytes(new.embedding)],
            )?;
            tx.commit()?;
            Ok(InsertOutcome::Inserted(id))
        }
        Err(e) if is_unique_violation(&e) => {
            drop(tx);
            let existing =
                find_by_key(conn, new.agent_id, new.source_key, new.heading)?.ok_or_else(
                    || anyhow!("duplicate key rejected but no row found for {}", new.heading),
                )?;
            update_chunk(conn, &existing.id, new.content, new.importance, new.embedding)?;
            Ok(InsertOutcome::RacedAsUpdate(existing.id))
        }
        Err(e) => Err(e).context("chunk insert failed"),
    }
}

/// Replace a chunk's content, importance, and embedding atomically, stamping
/// `updated_at`.
pub fn update_chunk(
    conn: &mut Connection,
    id: &str,
    content: &str,
    importance: i64,
    embedding: &[f32],
) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let tx = conn.transaction()?;

    let rows = tx.execute(
        "UPDATE chunks SET content = ?1, importance = ?2, updated_at = ?3 WHERE id = ?4",
        params![content, importance, now, id],
    )?;
    if rows == 0 {
        bail!("update target not found: {id}");
    }

    tx.execute("DELETE FROM chunks_vec WHERE id = ?1", params![id])?;
    tx.execute(
        "INSERT INTO chunks_vec (id, embedding) VALUES (?1, ?2)",
        params![id, embedding_to_bytes(embedding)],
    )?;

    tx.commit()?;
    Ok(())
}

/// Remove a chunk and its embedding.
pub fn delete_chunk(conn: &mut Connection, id: &str) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM chunks_vec WHERE id = ?1", params![id])?;
    tx.execute("DELETE FROM chunks WHERE id = ?1", params![id])?;
    tx.commit()?;
    Ok(())
}

// ── Retrieval queries ─────────────────────────────────────────────────────────

/// KNN search: the `limit` chunks nearest to `embedding`, scoped to the
/// agent, with `similarity = 1 - cosine distance`.
pub fn query_by_vector(
    conn: &Connection,
    agent_id: &str,
    embedding: &[f32],
    limit: usize,
) -> Result<Vec<ScoredChunk>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    // Over-fetch candidates: agent scoping happens after the KNN pass.
    let candidate_limit = (limit * 3) as i64;
    let mut stmt = conn.prepare(
        "SELECT id, distance FROM chunks_vec WHERE embedding MATCH ?1 \
         ORDER BY distance LIMIT ?2",
    )?;
    let candidates: Vec<(String, f64)> = stmt
        .query_map(params![embedding_to_bytes(embedding), candidate_limit], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut results = Vec::new();
    for (id, distance) in candidates {
        if results.len() >= limit {
            break;
        }
        let row = conn
            .query_row(
                "SELECT id, source_key, tags, content, importance, created_at, updated_at \
                 FROM chunks WHERE id = ?1 AND agent_id = ?2",
                params![id, agent_id],
                raw_scored_row,
            )
            .optional()?;
        if let Some(raw) = row {
            results.push(raw.into_scored(1.0 - distance)?);
        }
    }
    Ok(results)
}

/// Keyword search: chunks whose lowercased content contains *all* tokens as
/// substrings, ordered by importance then recency, fixed similarity 0.5.
///
/// Tokens must already be lowercased; an empty token list yields no results.
pub fn query_by_keyword(
    conn: &Connection,
    agent_id: &str,
    tokens: &[String],
    limit: usize,
) -> Result<Vec<ScoredChunk>> {
    if tokens.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let conditions: Vec<String> = (0..tokens.len())
        .map(|i| format!("instr(lower(content), ?{}) > 0", i + 2))
        .collect();
    let sql = format!(
        "SELECT id, source_key, tags, content, importance, created_at, updated_at \
         FROM chunks WHERE agent_id = ?1 AND {} \
         ORDER BY importance DESC, updated_at DESC LIMIT ?{}",
        conditions.join(" AND "),
        tokens.len() + 2
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut sql_params: Vec<&dyn rusqlite::types::ToSql> = vec![&agent_id];
    for token in tokens {
        sql_params.push(token);
    }
    let limit = limit as i64;
    sql_params.push(&limit);

    let rows = stmt
        .query_map(sql_params.as_slice(), raw_scored_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(|raw| raw.into_scored(0.5)).collect()
}

// ── Boot-context listings ─────────────────────────────────────────────────────

/// Chunks at or above the importance floor, ordered by source then id.
pub fn list_high_importance(
    conn: &Connection,
    agent_id: &str,
    floor: i64,
) -> Result<Vec<NoteRow>> {
    let mut stmt = conn.prepare(
        "SELECT source_key, tags, content FROM chunks \
         WHERE agent_id = ?1 AND importance >= ?2 ORDER BY source_key, id",
    )?;
    let rows = stmt
        .query_map(params![agent_id, floor], raw_note_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(RawNote::into_note).collect()
}

/// Chunks under a source prefix created after `since` (RFC 3339), newest
/// source first.
pub fn list_recent_by_prefix(
    conn: &Connection,
    agent_id: &str,
    prefix: &str,
    since: &str,
) -> Result<Vec<NoteRow>> {
    let like = format!("{prefix}%");
    let mut stmt = conn.prepare(
        "SELECT source_key, tags, content FROM chunks \
         WHERE agent_id = ?1 AND source_key LIKE ?2 AND created_at > ?3 \
         ORDER BY source_key DESC, id",
    )?;
    let rows = stmt
        .query_map(params![agent_id, like, since], raw_note_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(RawNote::into_note).collect()
}

/// Full chunk count for one agent scope.
pub fn count_chunks(conn: &Connection, agent_id: &str) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM chunks WHERE agent_id = ?1",
        params![agent_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

// ── Entities ──────────────────────────────────────────────────────────────────

/// The first `limit` known entities for the scope, oldest first.
pub fn list_entities(conn: &Connection, agent_id: &str, limit: usize) -> Result<Vec<Entity>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, entity_type, properties FROM entities \
         WHERE agent_id = ?1 ORDER BY id LIMIT ?2",
    )?;
    let rows: Vec<(String, String, String, Option<String>)> = stmt
        .query_map(params![agent_id, limit as i64], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, name, entity_type, properties)| {
            let properties = match properties {
                Some(json) => serde_json::from_str::<BTreeMap<String, PropertyValue>>(&json)
                    .with_context(|| format!("invalid properties on entity {id}"))?,
                None => BTreeMap::new(),
            };
            Ok(Entity {
                id,
                name,
                entity_type,
                properties,
            })
        })
        .collect()
}

/// True entity total for the scope.
pub fn count_entities(conn: &Connection, agent_id: &str) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entities WHERE agent_id = ?1",
        params![agent_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Insert an entity row. Properties are validated against the closed variant
/// by construction of the argument type.
pub fn insert_entity(
    conn: &Connection,
    agent_id: &str,
    name: &str,
    entity_type: &str,
    properties: &BTreeMap<String, PropertyValue>,
) -> Result<String> {
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO entities (id, agent_id, name, entity_type, properties, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, agent_id, name, entity_type, serde_json::to_string(properties)?, now],
    )?;
    Ok(id)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

struct RawScored {
    id: String,
    source_key: String,
    tags: String,
    content: String,
    importance: i64,
    created_at: String,
    updated_at: String,
}

impl RawScored {
    fn into_scored(self, similarity: f64) -> Result<ScoredChunk> {
        Ok(ScoredChunk {
            id: self.id,
            source_key: self.source_key,
            tags: parse_tags(&self.tags)?,
            content: self.content,
            importance: self.importance,
            created_at: self.created_at,
            updated_at: self.updated_at,
            similarity,
        })
    }
}

fn raw_scored_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawScored> {
    Ok(RawScored {
        id: row.get(0)?,
        source_key: row.get(1)?,
        tags: row.get(2)?,
        content: row.get(3)?,
        importance: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

struct RawNote {
    source_key: String,
    tags: String,
    content: String,
}

impl RawNote {
    fn into_note(self) -> Result<NoteRow> {
        Ok(NoteRow {
            source_key: self.source_key,
            tags: parse_tags(&self.tags)?,
            content: self.content,
        })
    }
}

fn raw_note_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawNote> {
    Ok(RawNote {
        source_key: row.get(0)?,
        tags: row.get(1)?,
        content: row.get(2)?,
    })
}

fn parse_tags(json: &str) -> Result<Vec<String>> {
    serde_json::from_str(json).context("invalid tags JSON in chunk row")
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
