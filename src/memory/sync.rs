//! Sync engine — reconciles documents against the chunk store.
//!
//! [`sync_document`] is idempotent: re-running it over an unchanged document
//! performs no writes. Change detection is fingerprint equality; embeddings
//! are only requested for chunks that will actually be written. A failed
//! embedding skips that one chunk and leaves its stored row untouched;
//! sibling chunks and the deletion sweep still run. Store failures abort the
//! whole run.

use anyhow::Result;
use rusqlite::Connection;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::config::MnemaConfig;
use crate::embedding::{chunk_input, EmbeddingClient};
use crate::memory::chunk::{chunk_markdown, fingerprint};
use crate::memory::source::Workspace;
use crate::memory::store::{self, InsertOutcome, NewChunk};
use crate::memory::types::SyncCounts;

/// Sync one document's current text against the store.
///
/// Per chunk: insert when the `(source_key, heading)` key is new, update when
/// the fingerprint changed, skip when identical. After all chunk writes, a
/// deletion sweep removes stored chunks whose heading vanished from the
/// document — never earlier, so a heading renamed within one pass cannot be
/// deleted right after being re-inserted.
pub async fn sync_document(
    conn: &mut Connection,
    embedder: &dyn EmbeddingClient,
    agent_id: &str,
    text: &str,
    source_key: &str,
    importance: i64,
) -> Result<SyncCounts> {
    let sections = chunk_markdown(text);
    let mut counts = SyncCounts::default();

    for section in &sections {
        let new_print = fingerprint(&section.text);
        let existing = store::find_by_key(conn, agent_id, source_key, &section.heading)?;

        match existing {
            Some(chunk) if fingerprint(&chunk.content) == new_print => {
                counts.skipped += 1;
            }
            Some(chunk) => {
                let embedding =
                    match embedder.embed(&chunk_input(&section.heading, &section.text)).await {
                        Ok(v) => v,
                        Err(e) => {
                            warn!(source = source_key, heading = %section.heading, error = %e,
                                  "embedding failed, chunk left unchanged");
                            continue;
                        }
                    };
                store::update_chunk(conn, &chunk.id, &section.text, importance, &embedding)?;
                counts.updated += 1;
            }
            None => {
                let embedding =
                    match embedder.embed(&chunk_input(&section.heading, &section.text)).await {
                        Ok(v) => v,
                        Err(e) => {
                            warn!(source = source_key, heading = %section.heading, error = %e,
                                  "embedding failed, chunk not stored");
                            continue;
                        }
                    };
                let outcome = store::insert_chunk(
                    conn,
                    &NewChunk {
                        agent_id,
                        source_key,
                        heading: &section.heading,
                        content: &section.text,
                        importance,
                        embedding: &embedding,
                    },
                )?;
                match outcome {
                    InsertOutcome::Inserted(_) => counts.inserted += 1,
                    InsertOutcome::RacedAsUpdate(_) => counts.updated += 1,
                }
            }
        }
    }

    // Deletion sweep: stored headings no longer present in the document.
    // One failed delete is logged and must not block the others.
    let current: HashSet<&str> = sections.iter().map(|s| s.heading.as_str()).collect();
    for (id, tag) in store::list_by_source(conn, agent_id, source_key)? {
        if !current.contains(tag.as_str()) {
            match store::delete_chunk(conn, &id) {
                Ok(()) => counts.deleted += 1,
                Err(e) => {
                    warn!(source = source_key, heading = %tag, error = %e, "delete failed")
                }
            }
        }
    }

    info!(source = source_key, counts = %counts, "synced document");
    Ok(counts)
}

/// Sync the whole corpus: the long-term memory file at high importance plus
/// the newest daily notes (bounded by `sync.daily_note_limit`, filename-date
/// descending) at medium importance.
pub async fn sync_all(
    conn: &mut Connection,
    embedder: &dyn EmbeddingClient,
    config: &MnemaConfig,
) -> Result<SyncCounts> {
    let workspace = Workspace::new(config.resolved_workspace_root());
    let agent_id = &config.storage.agent_id;
    let mut totals = SyncCounts::default();

    let memory_file = &config.workspace.memory_file;
    if workspace.exists(memory_file) {
        let text = workspace.read(memory_file)?;
        let counts = sync_document(
            conn,
            embedder,
            agent_id,
            &text,
            memory_file,
            config.sync.memory_importance,
        )
        .await?;
        totals.merge(counts);
    }

    let mut notes = workspace.daily_notes(&config.workspace.daily_dir)?;
    notes.reverse(); // lexicographic date prefix: newest first
    for name in notes.into_iter().take(config.sync.daily_note_limit) {
        let rel = format!("{}/{}", config.workspace.daily_dir, name);
        let text = workspace.read(&rel)?;
        let counts = sync_document(
            conn,
            embedder,
            agent_id,
            &text,
            &rel,
            config.sync.daily_importance,
        )
        .await?;
        totals.merge(counts);
    }

    info!(counts = %totals, "corpus sync complete");
    Ok(totals)
}
