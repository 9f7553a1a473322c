//! SQLite bootstrap for the chunk store.
//!
//! One database file holds everything mnema persists: `chunks` (heading-keyed
//! document sections), `chunks_vec` (their embeddings, a sqlite-vec vec0
//! table), `entities`, and `schema_meta`. [`open_database`] creates the file
//! on first use, applies the DDL and any pending migrations, and hands back a
//! connection ready for sync and recall.

pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use sqlite_vec::sqlite3_vec_init;
use std::path::Path;
use std::sync::Once;

static SQLITE_VEC_INIT: Once = Once::new();

/// Register sqlite-vec process-wide so `chunks_vec` resolves on every
/// connection, including the in-memory ones tests open.
pub fn load_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Open the chunk store at `path`, creating it and its parent directory on
/// first use.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    load_sqlite_vec();

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    bootstrap(&conn)?;

    tracing::info!(path = %path.display(), "chunk store ready");
    Ok(conn)
}

/// Pragmas, DDL, and migrations applied to every file-backed connection.
fn bootstrap(conn: &Connection) -> Result<()> {
    // WAL lets recall read while a sync writes
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(conn).context("failed to initialize schema")?;
    migrations::run_migrations(conn).context("failed to run migrations")?;
    Ok(())
}

/// The stored embedding model, when it differs from the configured one.
///
/// Vectors embedded by different models are not comparable, so a model
/// change silently degrades recall against everything embedded before it.
/// Callers surface a non-`None` return as a warning before syncing or
/// searching.
pub fn embedding_model_mismatch(
    conn: &Connection,
    configured: &str,
) -> rusqlite::Result<Option<String>> {
    Ok(migrations::get_embedding_model(conn)?.filter(|stored| stored != configured))
}

/// Open an in-memory database for testing.
#[cfg(test)]
pub fn open_memory_database() -> Result<Connection> {
    load_sqlite_vec();
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_mismatch_only_when_stored_differs() {
        let conn = open_memory_database().unwrap();

        // Nothing recorded yet (fresh store): no mismatch to report
        assert!(embedding_model_mismatch(&conn, "text-embedding-3-small")
            .unwrap()
            .is_none());

        migrations::set_embedding_model(&conn, "text-embedding-3-small").unwrap();
        assert!(embedding_model_mismatch(&conn, "text-embedding-3-small")
            .unwrap()
            .is_none());
        assert_eq!(
            embedding_model_mismatch(&conn, "text-embedding-3-large")
                .unwrap()
                .as_deref(),
            Some("text-embedding-3-small")
        );
    }
}
