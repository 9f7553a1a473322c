mod helpers;

use helpers::{backdate_chunk, insert_chunk, test_db};
use mnema::memory::boot::{boot_context, BootParams};
use mnema::memory::store;
use std::collections::BTreeMap;

fn params() -> BootParams<'static> {
    BootParams {
        importance_floor: 8,
        recent_days: 3,
        entity_limit: 20,
        daily_prefix: "notes/",
    }
}

#[test]
fn boot_bundles_important_and_recent_memories() {
    let mut conn = test_db();
    insert_chunk(
        &mut conn,
        "main",
        "MEMORY.md",
        "Identity",
        "core identity memory, always loaded at boot",
        8,
    );
    insert_chunk(
        &mut conn,
        "main",
        "notes/2026-08-29.md",
        "Log",
        "fresh daily note inside the recency window",
        6,
    );
    insert_chunk(
        &mut conn,
        "main",
        "MEMORY.md",
        "Scratch",
        "low importance memory that stays out of the bundle",
        4,
    );

    let context = boot_context(&conn, "main", &params()).unwrap();

    assert_eq!(context.memories.len(), 2);
    assert_eq!(
        context.memories[0],
        "[MEMORY.md] core identity memory, always loaded at boot"
    );
    assert_eq!(
        context.memories[1],
        "[notes/2026-08-29.md] fresh daily note inside the recency window"
    );
    assert_eq!(context.stats.total_memories, 3);
}

#[test]
fn chunk_in_both_tiers_appears_once() {
    let mut conn = test_db();
    // A daily-note chunk at importance 8 qualifies for both tiers
    insert_chunk(
        &mut conn,
        "main",
        "notes/2026-08-29.md",
        "Decision",
        "important decision recorded in today's daily note",
        8,
    );

    let context = boot_context(&conn, "main", &params()).unwrap();
    assert_eq!(context.memories.len(), 1);
}

#[test]
fn old_daily_notes_fall_outside_recency_window() {
    let mut conn = test_db();
    let stale = insert_chunk(
        &mut conn,
        "main",
        "notes/2026-08-15.md",
        "Log",
        "an ordinary note from two weeks ago, not important",
        6,
    );
    backdate_chunk(&conn, &stale, 14);

    let context = boot_context(&conn, "main", &params()).unwrap();
    assert!(context.memories.is_empty());
    // Still counted: stats describe the store, not the bundle
    assert_eq!(context.stats.total_memories, 1);
}

#[test]
fn entity_list_is_bounded_but_total_is_true_count() {
    let conn = test_db();
    for i in 0..25 {
        store::insert_entity(
            &conn,
            "main",
            &format!("entity-{i:02}"),
            "system",
            &BTreeMap::new(),
        )
        .unwrap();
    }

    let context = boot_context(&conn, "main", &params()).unwrap();
    assert_eq!(context.entities.len(), 20);
    assert_eq!(context.stats.total_entities, 25);
    assert_eq!(context.entities[0], "entity-00 (system)");
}

#[test]
fn boot_is_scoped_by_agent() {
    let mut conn = test_db();
    insert_chunk(
        &mut conn,
        "other",
        "MEMORY.md",
        "Identity",
        "another agent's memory must never leak into this boot",
        9,
    );
    store::insert_entity(&conn, "other", "stranger", "person", &BTreeMap::new()).unwrap();

    let context = boot_context(&conn, "main", &params()).unwrap();
    assert!(context.memories.is_empty());
    assert!(context.entities.is_empty());
    assert_eq!(context.stats.total_memories, 0);
    assert_eq!(context.stats.total_entities, 0);
}

#[test]
fn empty_store_boots_to_empty_bundle() {
    let conn = test_db();
    let context = boot_context(&conn, "main", &params()).unwrap();
    assert!(context.memories.is_empty());
    assert!(context.entities.is_empty());
    assert_eq!(context.stats.total_memories, 0);
    assert_eq!(context.stats.total_entities, 0);
}
