//! Terminal commands — thin shells over the sync, recall, and boot engines.

use anyhow::{Context, Result};

use crate::config::MnemaConfig;
use crate::db;
use crate::embedding;
use crate::memory::boot::{boot_context, BootParams};
use crate::memory::recall;
use crate::memory::source::Workspace;
use crate::memory::sync;
use crate::memory::types::SyncCounts;

/// Sync the corpus, one file, or all daily notes.
pub async fn run_sync(config: &MnemaConfig, file: Option<&str>, daily: bool) -> Result<()> {
    let mut conn = db::open_database(config.resolved_db_path())?;
    warn_on_model_change(&conn, config)?;
    let embedder = embedding::create_client(&config.embedding)?;
    let agent_id = &config.storage.agent_id;

    let totals = if let Some(rel) = file {
        let workspace = Workspace::new(config.resolved_workspace_root());
        let text = workspace.read(rel)?;
        let counts = sync::sync_document(
            &mut conn,
            embedder.as_ref(),
            agent_id,
            &text,
            rel,
            config.sync.memory_importance,
        )
        .await?;
        println!("{rel}: {counts}");
        counts
    } else if daily {
        let workspace = Workspace::new(config.resolved_workspace_root());
        let mut totals = SyncCounts::default();
        for name in workspace.daily_notes(&config.workspace.daily_dir)? {
            let rel = format!("{}/{}", config.workspace.daily_dir, name);
            let text = workspace.read(&rel)?;
            let counts = sync::sync_document(
                &mut conn,
                embedder.as_ref(),
                agent_id,
                &text,
                &rel,
                config.sync.daily_importance,
            )
            .await?;
            println!("{rel}: {counts}");
            totals.merge(counts);
        }
        totals
    } else {
        sync::sync_all(&mut conn, embedder.as_ref(), config).await?
    };

    db::migrations::set_embedding_model(&conn, &config.embedding.model)?;
    println!("\nTotal: {totals}");
    Ok(())
}

/// Run a hybrid recall query and print the ranked results.
pub async fn run_recall(
    config: &MnemaConfig,
    query: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let conn = db::open_database(config.resolved_db_path())?;
    warn_on_model_change(&conn, config)?;
    let embedder = embedding::create_client(&config.embedding)?;
    let limit = limit.unwrap_or(config.retrieval.default_limit);

    let results = recall::search(
        &conn,
        embedder.as_ref(),
        &config.storage.agent_id,
        query,
        limit,
    )
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    for (i, r) in results.iter().enumerate() {
        println!(
            "\n--- #{} [sim={:.3}] [{}] tags={} ---",
            i + 1,
            r.similarity,
            r.source_key,
            r.tags.join(","),
        );
        println!("{}", preview(&r.content, 300));
    }
    Ok(())
}

/// Assemble and print the boot context.
pub fn run_boot(config: &MnemaConfig, json: bool) -> Result<()> {
    let conn = db::open_database(config.resolved_db_path())?;
    let daily_prefix = config.daily_prefix();
    let ctx = boot_context(
        &conn,
        &config.storage.agent_id,
        &BootParams {
            importance_floor: config.boot.importance_floor,
            recent_days: config.boot.recent_days,
            entity_limit: config.boot.entity_limit,
            daily_prefix: &daily_prefix,
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ctx)?);
        return Ok(());
    }

    println!("=== BOOT CONTEXT ===");
    println!(
        "Stats: {} memories, {} entities\n",
        ctx.stats.total_memories, ctx.stats.total_entities
    );
    println!("--- Key Memories ---");
    for line in &ctx.memories {
        println!("{}", preview(line, 200));
    }
    println!("\n--- Known Entities ---");
    println!("{}", ctx.entities.join(", "));
    Ok(())
}

/// Print daily-note chunks from the last `days`.
pub fn run_recent(config: &MnemaConfig, days: i64) -> Result<()> {
    let conn = db::open_database(config.resolved_db_path())?;
    let rows = recall::recent_notes(
        &conn,
        &config.storage.agent_id,
        &config.daily_prefix(),
        days,
    )
    .context("recent notes query failed")?;

    for row in rows {
        println!("[{}] {}", row.source_key, preview(&row.content, 150));
    }
    Ok(())
}

/// Warn when the configured embedding model differs from the one that
/// produced the stored vectors: recall ranks against them anyway, but the
/// similarities are meaningless until the chunks are re-embedded.
fn warn_on_model_change(conn: &rusqlite::Connection, config: &MnemaConfig) -> Result<()> {
    if let Some(stored) = db::embedding_model_mismatch(conn, &config.embedding.model)? {
        tracing::warn!(
            stored = %stored,
            configured = %config.embedding.model,
            "embedding model changed — stored vectors are stale; clear the database and re-run `mnema sync`"
        );
    }
    Ok(())
}

/// Truncate to `max_chars`, appending "..." if anything was cut.
fn preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let prefix: String = content.chars().take(max_chars).collect();
        format!("{prefix}...")
    }
}
