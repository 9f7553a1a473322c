#![allow(dead_code)]

use async_trait::async_trait;
use mnema::db;
use mnema::embedding::{EmbeddingClient, EmbeddingError, EMBEDDING_DIM};
use mnema::memory::store::{self, InsertOutcome, NewChunk};
use rusqlite::Connection;
use sha2::{Digest, Sha256};

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::load_sqlite_vec();
    let conn = Connection::open_in_memory().unwrap();
    conn.pragma_update(None, "foreign_keys", "ON").unwrap();
    db::schema::init_schema(&conn).unwrap();
    db::migrations::run_migrations(&conn).unwrap();
    conn
}

/// Deterministic, content-sensitive embedding: spike positions derived from
/// the SHA-256 digest of the text. Identical text gives identical vectors;
/// different text gives near-orthogonal ones.
pub fn mock_embedding(text: &str) -> Vec<f32> {
    let digest = Sha256::digest(text.as_bytes());
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    for (i, byte) in digest.iter().enumerate() {
        v[(i * 53 + *byte as usize * 7) % EMBEDDING_DIM] += 1.0;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    for x in &mut v {
        *x /= norm;
    }
    v
}

/// Embedding client that always succeeds with [`mock_embedding`].
pub struct MockEmbedder;

#[async_trait]
impl EmbeddingClient for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(mock_embedding(text))
    }
}

/// Embedding client that fails for inputs containing `needle` and succeeds
/// otherwise — for exercising per-chunk failure isolation.
pub struct FailingFor {
    pub needle: String,
}

#[async_trait]
impl EmbeddingClient for FailingFor {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.contains(&self.needle) {
            Err(EmbeddingError::NoVector)
        } else {
            Ok(mock_embedding(text))
        }
    }
}

/// Insert a chunk directly via the store, embedding its content with
/// [`mock_embedding`] of the heading-prefixed input. Returns the chunk id.
pub fn insert_chunk(
    conn: &mut Connection,
    agent_id: &str,
    source_key: &str,
    heading: &str,
    content: &str,
    importance: i64,
) -> String {
    let embedding = mock_embedding(&format!("{heading}: {content}"));
    match store::insert_chunk(
        conn,
        &NewChunk {
            agent_id,
            source_key,
            heading,
            content,
            importance,
            embedding: &embedding,
        },
    )
    .unwrap()
    {
        InsertOutcome::Inserted(id) | InsertOutcome::RacedAsUpdate(id) => id,
    }
}

/// Backdate a chunk's created_at (RFC 3339) by `days`.
pub fn backdate_chunk(conn: &Connection, id: &str, days: i64) {
    let past = (chrono::Utc::now() - chrono::Duration::days(days)).to_rfc3339();
    conn.execute(
        "UPDATE chunks SET created_at = ?1 WHERE id = ?2",
        rusqlite::params![past, id],
    )
    .unwrap();
}

/// Count live chunks for one source.
pub fn chunk_count(conn: &Connection, agent_id: &str, source_key: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM chunks WHERE agent_id = ?1 AND source_key = ?2",
        rusqlite::params![agent_id, source_key],
        |row| row.get(0),
    )
    .unwrap()
}
